//! Fixed textual templates. Placeholders are written `{{name}}` and filled by
//! plain substitution.

pub const REACT_COMPONENT: &str = r#"import React{{hookImports}} from 'react';
{{imports}}
export default function {{componentName}}() {
{{componentLogic}}  return (
{{componentBody}}
  );
}
"#;

pub const REACT_STYLE_IMPORT: &str = "import './{{componentName}}.css';\n";

pub const REACT_CHILD_IMPORT: &str = "import {{componentName}} from './{{componentName}}';\n";

pub const REACT_INLINE_STYLES: &str = "const {{styleConst}} = `\n{{styles}}`;\n\n";

pub const REACT_BARREL_ENTRY: &str = "export { default as {{componentName}} } from './{{componentName}}';\n";

pub const VUE_COMPONENT: &str = r#"<template>
{{componentBody}}
</template>

<script>
{{imports}}
export default {
  name: '{{componentName}}',
{{componentLogic}}};
</script>
{{styleBlock}}"#;

pub const VUE_CHILD_IMPORT: &str = "import {{componentName}} from './{{componentName}}.vue';\n";

pub const VUE_SCOPED_STYLE: &str = "\n<style scoped>\n{{styles}}</style>\n";

pub const VUE_STYLE_SRC: &str = "\n<style scoped src=\"./{{componentName}}.css\"></style>\n";

pub const VUE_BARREL_ENTRY: &str = "export { default as {{componentName}} } from './{{componentName}}.vue';\n";

pub const HTML_DOCUMENT: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{{title}}</title>
  <meta name="description" content="{{description}}">
  <style>
{{styles}}  </style>
</head>
<body>
{{componentBody}}
</body>
</html>
"#;

pub const PAGE_STYLES: &str = r#".{{kebabName}} {
  display: flex;
  flex-direction: column;
  min-height: 100vh;
  margin: 0;
  font-family: Arial, Helvetica, sans-serif;
}
"#;

pub const CENTERED_PAGE_STYLES: &str = r#".{{kebabName}} {
  display: flex;
  flex-direction: column;
  align-items: center;
  justify-content: center;
  gap: 24px;
  min-height: 100vh;
  margin: 0;
  font-family: Arial, Helvetica, sans-serif;
}
"#;

pub const CONTAINER_STYLES: &str = r#".{{kebabName}} {
  display: flex;
  align-items: center;
  gap: 16px;
  padding: 16px 24px;
}
"#;

pub const MAIN_STYLES: &str = r#".{{kebabName}} {
  flex: 1;
  display: flex;
  flex-direction: column;
  gap: 16px;
  padding: 24px;
}
"#;

pub const LOGO_STYLES: &str = r#".{{kebabName}} img {
  display: block;
  max-height: 92px;
  width: auto;
}
"#;

pub const NAVIGATION_STYLES: &str = r#".{{kebabName}} ul {
  display: flex;
  gap: 16px;
  margin: 0;
  padding: 0;
  list-style: none;
}

.{{kebabName}} a {
  color: inherit;
  text-decoration: none;
}
"#;

pub const SEARCH_BOX_STYLES: &str = r#".{{kebabName}} {
  display: flex;
  width: 584px;
  max-width: 100%;
  border: 1px solid #dfe1e5;
  border-radius: 24px;
  overflow: hidden;
}

.{{kebabName}} input {
  flex: 1;
  padding: 12px 16px;
  border: none;
  outline: none;
  font-size: 16px;
}

.{{kebabName}} button {
  padding: 0 20px;
  border: none;
  background: #f8f9fa;
  cursor: pointer;
}
"#;

pub const BUTTONS_STYLES: &str = r#".{{kebabName}} {
  display: flex;
  gap: 12px;
}

.{{kebabName}} button {
  padding: 8px 16px;
  border: 1px solid #dadce0;
  border-radius: 4px;
  background: #f8f9fa;
  cursor: pointer;
}
"#;

pub const FORM_STYLES: &str = r#".{{kebabName}} {
  display: flex;
  flex-direction: column;
  gap: 12px;
  max-width: 480px;
}

.{{kebabName}} input {
  padding: 8px 12px;
  border: 1px solid #dadce0;
  border-radius: 4px;
}
"#;

pub const RESPONSIVE_STYLES: &str = r#"@media (max-width: 768px) {
  .{{kebabName}} {
    width: 100%;
    box-sizing: border-box;
    padding-left: 16px;
    padding-right: 16px;
  }
}
"#;

/// Replace every `{{name}}` placeholder with its value in one pass over
/// `template`; substituted text is never scanned again.
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        output.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let value = after.find("}}").and_then(|end| {
            let name = &after[..end];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, end))
        });

        match value {
            Some((value, end)) => {
                output.push_str(value);
                rest = &after[end + 2..];
            }
            None => {
                output.push_str("{{");
                rest = after;
            }
        }
    }

    output.push_str(rest);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_replaces_all_occurrences() {
        let css = render(NAVIGATION_STYLES, &[("kebabName", "main-nav")]);

        assert!(css.contains(".main-nav ul {"));
        assert!(css.contains(".main-nav a {"));
        assert!(!css.contains("{{"));
    }

    #[test]
    fn test_render_leaves_unknown_placeholders() {
        assert_eq!(render("{{a}} {{b}}", &[("a", "x")]), "x {{b}}");
    }

    #[test]
    fn test_render_does_not_expand_substituted_text() {
        let styles = "body::after { content: \"{{componentBody}}\"; }";
        let html = render(
            HTML_DOCUMENT,
            &[
                ("title", "Page"),
                ("description", ""),
                ("styles", styles),
                ("componentBody", "<main></main>"),
            ],
        );

        assert!(html.contains(styles));
        assert_eq!(html.matches("<main></main>").count(), 1);
    }

    #[test]
    fn test_render_handles_adjacent_braces() {
        assert_eq!(render("{{a}}};", &[("a", "x")]), "x};");
        assert_eq!(render("{{ {{a}}", &[("a", "x")]), "{{ x");
    }
}
