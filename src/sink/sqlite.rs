//! SQLite 输出：每个输出目标对应同一数据库中的一张表
//!
//! 所有列均为 TEXT，与 CSV 输出保持一致

use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, params_from_iter};

use super::{ERROR_LOG_COLUMNS, ErrorLogEntry, Sink, sanitize_name};
use crate::report::flatten::FlatRow;

pub struct SqliteSink {
    conn: Connection,
}

impl SqliteSink {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("创建数据库目录失败: {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("打开 SQLite 数据库失败: {}", path.display()))?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// 在一个事务中删除并重建表，再插入全部行
    fn replace_table<'a, I>(&mut self, destination: &str, columns: &[&str], rows: I) -> Result<usize>
    where
        I: IntoIterator<Item = Vec<&'a str>>,
    {
        let table = quote_ident(&sanitize_name(destination));
        let tx = self.conn.transaction()?;
        tx.execute(&format!("DROP TABLE IF EXISTS {}", table), [])?;

        if columns.is_empty() {
            tx.commit()?;
            return Ok(0);
        }

        let column_defs: Vec<String> = columns
            .iter()
            .map(|c| format!("{} TEXT NOT NULL DEFAULT ''", quote_ident(c)))
            .collect();
        tx.execute(
            &format!("CREATE TABLE {} ({})", table, column_defs.join(", ")),
            [],
        )?;

        let mut count = 0;
        {
            let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} VALUES ({})",
                table,
                placeholders.join(", ")
            ))?;
            for values in rows {
                stmt.execute(params_from_iter(values))?;
                count += 1;
            }
        }
        tx.commit()?;
        Ok(count)
    }

    #[cfg(test)]
    fn select_all(&self, destination: &str) -> Result<Vec<Vec<String>>> {
        let table = quote_ident(&sanitize_name(destination));
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT * FROM {} ORDER BY rowid", table))?;
        let width = stmt.column_count();
        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get::<_, String>(i))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    #[cfg(test)]
    fn column_names(&self, destination: &str) -> Result<Vec<String>> {
        let table = quote_ident(&sanitize_name(destination));
        let stmt = self.conn.prepare(&format!("SELECT * FROM {}", table))?;
        Ok(stmt.column_names().into_iter().map(str::to_string).collect())
    }
}

impl Sink for SqliteSink {
    fn write_table(&mut self, destination: &str, columns: &[&str], rows: &[FlatRow]) -> Result<()> {
        let count = self.replace_table(
            destination,
            columns,
            rows.iter()
                .map(|row| columns.iter().map(|c| row.get(c)).collect::<Vec<_>>()),
        )?;
        tracing::info!("已写出 {} 行到表 {}", count, destination);
        Ok(())
    }

    fn write_totals(&mut self, destination: &str, totals: &[(String, String)]) -> Result<()> {
        let columns: Vec<&str> = totals.iter().map(|(k, _)| k.as_str()).collect();
        let values: Vec<&str> = totals.iter().map(|(_, v)| v.as_str()).collect();
        self.replace_table(destination, &columns, std::iter::once(values))?;
        tracing::info!("已写出汇总到表 {}", destination);
        Ok(())
    }

    fn append_error(&mut self, destination: &str, entry: &ErrorLogEntry) -> Result<()> {
        let table = quote_ident(&sanitize_name(destination));
        let column_defs: Vec<String> = ERROR_LOG_COLUMNS
            .iter()
            .map(|c| format!("{} TEXT NOT NULL DEFAULT ''", quote_ident(c)))
            .collect();
        self.conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {} ({})",
                table,
                column_defs.join(", ")
            ),
            [],
        )?;
        self.conn.execute(
            &format!(
                "INSERT INTO {} VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                table
            ),
            params_from_iter(entry.values()),
        )?;
        Ok(())
    }

    fn remove(&mut self, destination: &str) -> Result<()> {
        let table = quote_ident(&sanitize_name(destination));
        self.conn
            .execute(&format!("DROP TABLE IF EXISTS {}", table), [])?;
        Ok(())
    }
}

/// SQL 标识符加双引号并转义
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
