use tabled::{settings::Style, Table, Tabled};

use crate::resolver::NodeFailure;

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Resource")]
    pub label: String,
    #[tabled(rename = "Count")]
    pub value: String,
}

#[derive(Default)]
pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            label: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

#[derive(Tabled)]
struct FailureRow {
    #[tabled(rename = "Node")]
    node: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Root")]
    root: String,
    #[tabled(rename = "Message")]
    message: String,
}

pub fn failures_table(failures: &[NodeFailure]) -> String {
    if failures.is_empty() {
        return String::new();
    }
    let rows: Vec<FailureRow> = failures
        .iter()
        .map(|f| FailureRow {
            node: f.node.to_string(),
            kind: format!("{:?}", f.kind),
            root: f.root.to_string(),
            message: f.message.clone(),
        })
        .collect();
    Table::new(rows).with(Style::rounded()).to_string()
}
