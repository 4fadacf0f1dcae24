//! Schema designer workspace: a list of table definitions, the selected
//! table, and the MySQL script generated from them.
//!
//! The script is regenerated after every structural change, which drops any
//! appended assistant suggestion.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{require, AppError, AppResult};

pub const SUGGESTION_MARKER: &str = "\n-- SUGERENCIA DE IA --\n";
const SCRIPT_HEADER: &str = "CREATE DATABASE IF NOT EXISTS menta_verde_portal;\nUSE menta_verde_portal;\n\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKey {
    #[serde(rename = "PRI")]
    Primary,
    #[serde(rename = "FOR")]
    Foreign,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<ColumnKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,
}

impl TableColumn {
    fn new(name: &str, data_type: &str) -> Self {
        Self {
            name: name.to_string(),
            data_type: data_type.to_string(),
            key: None,
            extra: None,
        }
    }

    fn primary_id() -> Self {
        Self {
            key: Some(ColumnKey::Primary),
            extra: Some("AUTO_INCREMENT".into()),
            ..Self::new("id", "INT")
        }
    }

    fn sql_line(&self) -> String {
        let mut line = format!("  {} {}", self.name, self.data_type);
        if self.key == Some(ColumnKey::Primary) {
            line.push_str(" PRIMARY KEY");
        }
        if let Some(extra) = self.extra.as_deref().filter(|e| !e.is_empty()) {
            line.push(' ');
            line.push_str(extra);
        }
        line
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbTable {
    pub name: String,
    pub columns: Vec<TableColumn>,
}

/// Editable attribute of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnField {
    Name,
    #[serde(alias = "dataType")]
    Type,
    Key,
    Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignerView {
    pub tables: Vec<DbTable>,
    pub selected_index: usize,
    pub sql: String,
}

/// Replace every run of whitespace with a single `_`.
fn underscore_whitespace(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_run = false;
    for c in raw.chars() {
        if c.is_whitespace() {
            if !in_run {
                out.push('_');
            }
            in_run = true;
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}

/// `CREATE DATABASE` header followed by one `CREATE TABLE` per table.
pub fn generate_sql(tables: &[DbTable]) -> String {
    let mut code = String::from(SCRIPT_HEADER);
    for table in tables {
        code.push_str(&format!("CREATE TABLE {} (\n", table.name));
        let cols: Vec<String> = table.columns.iter().map(TableColumn::sql_line).collect();
        code.push_str(&cols.join(",\n"));
        code.push_str("\n);\n\n");
    }
    code
}

#[derive(Debug, Clone)]
pub struct SchemaDesigner {
    tables: Vec<DbTable>,
    selected: usize,
    sql: String,
}

impl Default for SchemaDesigner {
    fn default() -> Self {
        let tables = vec![DbTable {
            name: "usuarios".into(),
            columns: vec![
                TableColumn::primary_id(),
                TableColumn::new("usuario", "VARCHAR(50)"),
                TableColumn::new("email", "VARCHAR(100)"),
            ],
        }];
        let sql = generate_sql(&tables);
        Self {
            tables,
            selected: 0,
            sql,
        }
    }
}

impl SchemaDesigner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> DesignerView {
        DesignerView {
            tables: self.tables.clone(),
            selected_index: self.selected,
            sql: self.sql.clone(),
        }
    }

    pub fn tables(&self) -> &[DbTable] {
        &self.tables
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    fn regenerate(&mut self) {
        self.sql = generate_sql(&self.tables);
    }

    fn selected_table_mut(&mut self) -> AppResult<&mut DbTable> {
        let selected = self.selected;
        self.tables
            .get_mut(selected)
            .ok_or_else(|| AppError::Invalid(format!("Tabla inexistente: {selected}")))
    }

    pub fn select_table(&mut self, index: usize) -> AppResult<()> {
        if index >= self.tables.len() {
            return Err(AppError::Invalid(format!("Tabla inexistente: {index}")));
        }
        self.selected = index;
        Ok(())
    }

    /// Add a table named after `name` (lowercased, whitespace runs as `_`)
    /// holding only an auto-increment `id`, and select it.
    pub fn add_table(&mut self, name: &str) -> AppResult<()> {
        require(name, "nombre de la tabla")?;
        let name = underscore_whitespace(&name.to_lowercase());
        self.tables.push(DbTable {
            name,
            columns: vec![TableColumn::primary_id()],
        });
        self.selected = self.tables.len() - 1;
        self.regenerate();
        Ok(())
    }

    /// Remove the table at `index`. The last remaining table is kept.
    pub fn delete_table(&mut self, index: usize) -> bool {
        if self.tables.len() <= 1 || index >= self.tables.len() {
            debug!(index, tables = self.tables.len(), "table delete refused");
            return false;
        }
        self.tables.remove(index);
        self.selected = 0;
        self.regenerate();
        true
    }

    pub fn add_column(&mut self) -> AppResult<()> {
        let table = self.selected_table_mut()?;
        let name = format!("columna_{}", table.columns.len() + 1);
        table.columns.push(TableColumn::new(&name, "VARCHAR(255)"));
        self.regenerate();
        Ok(())
    }

    pub fn update_column(&mut self, index: usize, field: ColumnField, value: &str) -> AppResult<()> {
        let table = self.selected_table_mut()?;
        let column = table
            .columns
            .get_mut(index)
            .ok_or_else(|| AppError::Invalid(format!("Columna inexistente: {index}")))?;
        match field {
            ColumnField::Name => column.name = value.to_string(),
            ColumnField::Type => column.data_type = value.to_string(),
            ColumnField::Key => {
                column.key = match value.trim() {
                    "" => None,
                    "PRI" => Some(ColumnKey::Primary),
                    "FOR" => Some(ColumnKey::Foreign),
                    other => {
                        return Err(AppError::Invalid(format!("Llave inválida: {other}")));
                    }
                }
            }
            ColumnField::Extra => {
                column.extra = Some(value.to_string()).filter(|v| !v.is_empty());
            }
        }
        self.regenerate();
        Ok(())
    }

    pub fn delete_column(&mut self, index: usize) -> AppResult<()> {
        let table = self.selected_table_mut()?;
        if index >= table.columns.len() {
            return Err(AppError::Invalid(format!("Columna inexistente: {index}")));
        }
        table.columns.remove(index);
        self.regenerate();
        Ok(())
    }

    /// Prompt asking the assistant for one more table.
    pub fn suggestion_prompt(&self) -> AppResult<String> {
        let tables = serde_json::to_string(&self.tables)?;
        Ok(format!(
            "Basado en estas tablas: {tables}, sugiere una nueva tabla que mejoraría la base de \
             datos para un portal empresarial. Proporciona solo el script SQL CREATE TABLE en español."
        ))
    }

    pub fn append_suggestion(&mut self, suggestion: &str) {
        self.sql.push_str(SUGGESTION_MARKER);
        self.sql.push_str(suggestion);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_script() {
        let designer = SchemaDesigner::new();
        assert_eq!(
            designer.sql(),
            "CREATE DATABASE IF NOT EXISTS menta_verde_portal;\nUSE menta_verde_portal;\n\n\
             CREATE TABLE usuarios (\n  id INT PRIMARY KEY AUTO_INCREMENT,\n  usuario VARCHAR(50),\n  email VARCHAR(100)\n);\n\n"
        );
    }

    #[test]
    fn test_add_table_normalizes_name_and_selects_it() {
        let mut designer = SchemaDesigner::new();
        designer.add_table("Mis   Citas Pendientes").unwrap();
        assert_eq!(designer.tables().len(), 2);
        assert_eq!(designer.selected_index(), 1);
        let table = &designer.tables()[1];
        assert_eq!(table.name, "mis_citas_pendientes");
        assert_eq!(table.columns, vec![TableColumn::primary_id()]);
        assert!(designer
            .sql()
            .ends_with("CREATE TABLE mis_citas_pendientes (\n  id INT PRIMARY KEY AUTO_INCREMENT\n);\n\n"));
        assert!(designer.add_table("  ").is_err());
        assert_eq!(underscore_whitespace(" notas\tde  cita"), "_notas_de_cita");
    }

    #[test]
    fn test_columns_edit_cycle() {
        let mut designer = SchemaDesigner::new();
        designer.add_column().unwrap();
        assert_eq!(designer.tables()[0].columns[3].name, "columna_4");
        assert_eq!(designer.tables()[0].columns[3].data_type, "VARCHAR(255)");

        designer.update_column(3, ColumnField::Name, "cliente_id").unwrap();
        designer.update_column(3, ColumnField::Type, "INT").unwrap();
        designer.update_column(3, ColumnField::Key, "FOR").unwrap();
        assert!(designer.sql().contains("  cliente_id INT\n);"));
        assert!(designer.update_column(3, ColumnField::Key, "UNI").is_err());

        designer.update_column(1, ColumnField::Extra, "NOT NULL").unwrap();
        assert!(designer.sql().contains("  usuario VARCHAR(50) NOT NULL,"));

        designer.delete_column(3).unwrap();
        assert!(!designer.sql().contains("cliente_id"));
        assert!(designer.delete_column(9).is_err());
    }

    #[test]
    fn test_last_table_cannot_be_deleted() {
        let mut designer = SchemaDesigner::new();
        assert!(!designer.delete_table(0));
        designer.add_table("ventas").unwrap();
        assert_eq!(designer.selected_index(), 1);
        assert!(designer.delete_table(0));
        assert_eq!(designer.selected_index(), 0);
        assert_eq!(designer.tables()[0].name, "ventas");
        assert!(!designer.sql().contains("usuarios"));
    }

    #[test]
    fn test_suggestion_prompt_and_append() {
        let mut designer = SchemaDesigner::new();
        let prompt = designer.suggestion_prompt().unwrap();
        assert!(prompt.starts_with(
            "Basado en estas tablas: [{\"name\":\"usuarios\",\"columns\":[{\"name\":\"id\",\"type\":\"INT\",\"key\":\"PRI\",\"extra\":\"AUTO_INCREMENT\"},{\"name\":\"usuario\",\"type\":\"VARCHAR(50)\"}"
        ));
        let before = designer.sql().to_string();
        designer.append_suggestion("CREATE TABLE citas (id INT);");
        assert_eq!(
            designer.sql(),
            format!("{before}\n-- SUGERENCIA DE IA --\nCREATE TABLE citas (id INT);")
        );
        designer.add_column().unwrap();
        assert!(!designer.sql().contains("SUGERENCIA"));
    }
}
