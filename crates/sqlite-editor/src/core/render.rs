//! HTML fragments for the webview.
//!
//! Every string that comes out of the loaded file (table and column names,
//! declared types, defaults, cell values) passes through [`escape_html`]
//! before it is placed into markup. Styling is left to the front-end.

use crate::core::browser;
use crate::core::editor::EditorState;
use crate::core::grid::Page;
use crate::core::types::{CellValue, ColumnDescriptor, TableSummary};

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

pub fn table_list(tables: &[TableSummary], query: &str, active: Option<&str>) -> String {
    let visible = browser::filter(tables, query);
    if visible.is_empty() {
        let msg = if tables.is_empty() {
            "No tables loaded"
        } else {
            "No matching tables"
        };
        return format!("<div class=\"placeholder\">{msg}</div>");
    }

    let mut out = String::from("<ul class=\"tables\">");
    for t in visible {
        let name = escape_html(&t.name);
        let class = if active == Some(t.name.as_str()) {
            " class=\"active\""
        } else {
            ""
        };
        out.push_str(&format!(
            "<li{class} data-table=\"{name}\"><span class=\"name\">{name}</span><span class=\"count\">{}</span></li>",
            t.row_count
        ));
    }
    out.push_str("</ul>");
    out
}

fn cell(v: &CellValue) -> String {
    match v {
        CellValue::Null => "<span class=\"null\">NULL</span>".to_string(),
        other => escape_html(&other.to_string()),
    }
}

pub fn grid(page: &Page) -> String {
    if page.is_empty() {
        return "<div class=\"placeholder\">Table is empty</div>".to_string();
    }

    let mut out = String::from("<table class=\"grid\"><thead><tr>");
    for c in &page.columns {
        let pk = if page.primary_key.contains(c) {
            " class=\"pk\""
        } else {
            ""
        };
        out.push_str(&format!("<th{pk}>{}</th>", escape_html(c)));
    }
    out.push_str("</tr></thead><tbody>");

    for row in &page.rows {
        match &row.key {
            Some(key) => {
                let key = serde_json::to_string(key).unwrap_or_default();
                out.push_str(&format!("<tr data-key=\"{}\">", escape_html(&key)));
            }
            None => out.push_str("<tr class=\"readonly\">"),
        }
        for v in &row.values {
            out.push_str(&format!("<td>{}</td>", cell(v)));
        }
        out.push_str("</tr>");
    }
    out.push_str("</tbody></table>");
    out.push_str(&format!(
        "<div class=\"footer\">{} of {} rows</div>",
        page.rows.len(),
        page.total_rows
    ));
    out
}

pub fn structure(columns: &[ColumnDescriptor]) -> String {
    let mut out = String::from(
        "<table class=\"structure\"><thead><tr><th>Name</th><th>Type</th><th>Not null</th><th>Default</th><th>Primary key</th></tr></thead><tbody>",
    );
    for c in columns {
        let default = c
            .default_value
            .as_deref()
            .map(escape_html)
            .unwrap_or_else(|| "None".to_string());
        out.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape_html(&c.name),
            escape_html(&c.declared_type),
            if c.not_null { "yes" } else { "no" },
            default,
            if c.primary_key { "yes" } else { "no" },
        ));
    }
    out.push_str("</tbody></table>");
    out
}

pub fn form(state: &EditorState) -> String {
    let (title, fields) = match state {
        EditorState::Closed => return String::new(),
        EditorState::Insert { fields } => ("Insert row", fields),
        EditorState::Edit { fields, .. } => ("Edit row", fields),
    };

    let mut out = format!("<form class=\"row-editor\"><h2>{title}</h2>");
    for f in fields {
        let name = escape_html(&f.column);
        let badge = if f.primary_key { "<span class=\"pk\">PK</span>" } else { "" };
        let readonly = if f.read_only { " readonly" } else { "" };
        out.push_str(&format!(
            "<label>{name}{badge}<span class=\"type\">{}</span><input type=\"text\" name=\"{name}\" placeholder=\"{}\" value=\"{}\"{readonly}></label>",
            escape_html(&f.declared_type),
            f.placeholder,
            escape_html(&f.value),
        ));
        if f.missing_required {
            out.push_str("<span class=\"error\">This field cannot be empty</span>");
        }
    }
    out.push_str("</form>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::database::tests::seeded;
    use crate::core::editor::{Coercion, RowEditor};
    use crate::core::grid::load_rows;
    use crate::core::limits::RowLimit;
    use crate::core::schema;

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(
            escape_html("<img src=x onerror=\"alert('1')\">&"),
            "&lt;img src=x onerror=&quot;alert(&#39;1&#39;)&quot;&gt;&amp;"
        );
    }

    #[test]
    fn stored_script_is_never_rendered_raw() {
        let db = seeded(
            "CREATE TABLE \"<b>t</b>\" (id INTEGER PRIMARY KEY, \"<i>c</i>\" TEXT);
             INSERT INTO \"<b>t</b>\" VALUES (1, '<script>alert(1)</script>');",
        );
        let page = load_rows(&db, "<b>t</b>", RowLimit::Unlimited).unwrap();
        let html = grid(&page);
        assert!(!html.contains("<script>"));
        assert!(!html.contains("<i>c</i>"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));

        let tables = crate::core::browser::list_tables(&db).unwrap();
        let list = table_list(&tables, "", Some("<b>t</b>"));
        assert!(!list.contains("<b>t</b>"));
        assert!(list.contains("class=\"active\""));

        let cols = schema::describe_columns(&db, "<b>t</b>");
        assert!(!structure(&cols).contains("<i>"));
    }

    #[test]
    fn null_gets_a_marker_and_empty_tables_a_placeholder() {
        let db = seeded("CREATE TABLE t (a); INSERT INTO t VALUES (NULL); CREATE TABLE e (a);");
        let html = grid(&load_rows(&db, "t", RowLimit::Unlimited).unwrap());
        assert!(html.contains("<span class=\"null\">NULL</span>"));
        assert!(html.contains("class=\"readonly\""));

        let empty = grid(&load_rows(&db, "e", RowLimit::Unlimited).unwrap());
        assert_eq!(empty, "<div class=\"placeholder\">Table is empty</div>");
    }

    #[test]
    fn table_list_placeholders_differ() {
        assert!(table_list(&[], "", None).contains("No tables loaded"));
        let t = vec![TableSummary {
            name: "users".into(),
            row_count: 4,
        }];
        assert!(table_list(&t, "zz", None).contains("No matching tables"));
        assert!(table_list(&t, "USE", None).contains("<span class=\"count\">4</span>"));
    }

    #[test]
    fn form_marks_required_and_escapes_values() {
        let db = seeded("CREATE TABLE u (id INTEGER PRIMARY KEY, name TEXT NOT NULL);");
        let descriptors = schema::describe_columns(&db, "u");
        let mut editor = RowEditor::new(Coercion::Lenient);
        assert_eq!(form(editor.state()), "");

        editor.open_for_insert(&descriptors, &["id".into(), "name".into()]);
        let html = form(editor.state());
        assert!(html.contains("Insert row"));
        assert!(html.contains("placeholder=\"required\""));
        assert!(html.contains("This field cannot be empty"));
        assert!(html.contains("<span class=\"pk\">PK</span>"));
    }
}
