//! Attribute parsing for `<ref>` and `<references>` tags.

use quarto_cite_registry::Warning;

/// Normalize an attribute value; blank values count as absent.
fn value(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Attributes understood by `<ref>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefArgs {
    pub name: Option<String>,
    pub group: Option<String>,
    pub extends: Option<String>,
    pub follow: Option<String>,
    pub dir: Option<String>,
}

impl RefArgs {
    pub fn parse(args: &[(String, String)]) -> Result<Self, Warning> {
        let mut parsed = Self::default();
        for (attribute, raw) in args {
            let slot = match attribute.trim().to_ascii_lowercase().as_str() {
                "name" => &mut parsed.name,
                "group" => &mut parsed.group,
                "extends" | "details" => &mut parsed.extends,
                "follow" => &mut parsed.follow,
                "dir" => &mut parsed.dir,
                _ => {
                    return Err(Warning::UnknownAttribute {
                        attribute: attribute.clone(),
                    });
                }
            };
            *slot = value(raw);
        }
        Ok(parsed)
    }
}

/// Attributes understood by `<references>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListArgs {
    pub group: Option<String>,
}

impl ListArgs {
    pub fn parse(args: &[(String, String)]) -> Result<Self, Warning> {
        let mut parsed = Self::default();
        for (attribute, raw) in args {
            match attribute.trim().to_ascii_lowercase().as_str() {
                "group" => parsed.group = value(raw),
                // Layout hint for the renderer; accepted and ignored here.
                "responsive" => {}
                _ => {
                    return Err(Warning::UnknownAttribute {
                        attribute: attribute.clone(),
                    });
                }
            }
        }
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_ref_args() {
        let parsed = RefArgs::parse(&args(&[
            ("name", " smith "),
            ("Group", "notes"),
            ("details", "book"),
            ("dir", "rtl"),
        ]))
        .unwrap();
        assert_eq!(parsed.name.as_deref(), Some("smith"));
        assert_eq!(parsed.group.as_deref(), Some("notes"));
        assert_eq!(parsed.extends.as_deref(), Some("book"));
        assert_eq!(parsed.dir.as_deref(), Some("rtl"));
        assert_eq!(parsed.follow, None);
    }

    #[test]
    fn test_blank_values_are_absent() {
        let parsed = RefArgs::parse(&args(&[("name", "  ")])).unwrap();
        assert_eq!(parsed.name, None);
    }

    #[test]
    fn test_unknown_attribute() {
        assert_eq!(
            RefArgs::parse(&args(&[("page", "4")])),
            Err(Warning::UnknownAttribute {
                attribute: "page".to_string()
            })
        );
        assert!(ListArgs::parse(&args(&[("responsive", "1")])).is_ok());
        assert!(ListArgs::parse(&args(&[("name", "x")])).is_err());
    }
}
