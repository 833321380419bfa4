//! Archive path templating
//!
//! Templates are expanded by literal find-and-replace, not parsed. The
//! expansion is total: every placeholder is always defined, and a field that
//! is absent for an event simply expands to the empty string.

/// Field values substituted into a template.
///
/// An empty string is a valid value for any field.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateFields<'a> {
    /// Child display name (`%child%`)
    pub child: &'a str,
    /// Four-digit year (`%YYYY%`)
    pub year: &'a str,
    /// Two-digit month (`%MM%`)
    pub month: &'a str,
    /// Two-digit day (`%DD%`)
    pub day: &'a str,
    /// Lowercase hex MD5 of the attachment key (`%keymd5%`)
    pub key_md5: &'a str,
    /// Raw attachment key (`%imgkey%`)
    pub img_key: &'a str,
}

/// Expand every recognized placeholder in `template`.
pub fn expand(template: &str, fields: &TemplateFields<'_>) -> String {
    template
        .replace("%child%", fields.child)
        .replace("%YYYY%", fields.year)
        .replace("%MM%", fields.month)
        .replace("%DD%", fields.day)
        .replace("%keymd5%", fields.key_md5)
        .replace("%imgkey%", fields.img_key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_directory_template() {
        let fields = TemplateFields {
            child: "Maya",
            year: "2019",
            month: "01",
            day: "01",
            ..Default::default()
        };
        assert_eq!(
            expand("./archive/%child%/%YYYY%/%MM%/", &fields),
            "./archive/Maya/2019/01/"
        );
    }

    #[test]
    fn test_expand_filename_template() {
        let fields = TemplateFields {
            child: "Maya",
            year: "2019",
            month: "01",
            day: "01",
            key_md5: "9e107d9d372bb6826bd81d3542a419d6",
            img_key: "obj-a",
        };
        assert_eq!(
            expand("%YYYY%-%MM%-%DD%_%keymd5%_%imgkey%", &fields),
            "2019-01-01_9e107d9d372bb6826bd81d3542a419d6_obj-a"
        );
    }

    #[test]
    fn test_absent_fields_expand_to_empty() {
        let fields = TemplateFields::default();
        assert_eq!(expand("%child%/%YYYY%-%keymd5%", &fields), "/-");
    }

    #[test]
    fn test_repeated_placeholders() {
        let fields = TemplateFields {
            year: "2019",
            ..Default::default()
        };
        assert_eq!(expand("%YYYY%/%YYYY%", &fields), "2019/2019");
    }

    #[test]
    fn test_unrecognized_text_passes_through() {
        let fields = TemplateFields::default();
        assert_eq!(expand("plain/%nope%/path", &fields), "plain/%nope%/path");
    }
}
