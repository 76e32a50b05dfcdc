use std::io::{self, Write};

use futures_util::TryStreamExt;
use thiserror::Error;
use tracing::info;

use crate::db::{DocumentStore, FetchError};
use crate::models::{DisplayRecord, Record};

const TITLE: &str = "📊 LISTADO DE USUARIOS/PACIENTES";
const RULE_WIDTH: usize = 80;
const EMPTY_NOTICE: &str = "⚠️  No hay usuarios registrados en la base de datos.";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("unable to write report: {0}")]
    Io(#[from] io::Error),
}

impl ReportError {
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, ReportError::Fetch(error) if error.is_permission_denied())
    }
}

/// Prints the roster of one collection
pub struct Reporter<S> {
    store: S,
    collection: String,
}

impl<S: DocumentStore> Reporter<S> {
    pub fn new(store: S, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    /// Scan the collection and write the listing, returning the number of records printed
    pub async fn run<W: Write>(&self, out: &mut W) -> Result<usize, ReportError> {
        info!(collection = %self.collection, "querying collection");

        write_banner(out)?;

        let mut records = self.store.scan(&self.collection);
        let mut count = 0;
        while let Some(record) = records.try_next().await? {
            count += 1;
            write_record(out, count, &record)?;
        }

        if count == 0 {
            writeln!(out, "\n{EMPTY_NOTICE}")?;
        }
        write_summary(out, count)?;
        out.flush()?;

        info!(collection = %self.collection, count, "listing complete");
        Ok(count)
    }
}

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

fn write_banner<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "\n{TITLE}\n")?;
    writeln!(out, "{}", rule())
}

fn write_record<W: Write>(out: &mut W, index: usize, record: &Record) -> io::Result<()> {
    let display = DisplayRecord::from(record);

    writeln!(out, "\n{index}. {} {}", display.display_name, display.surname)?;
    writeln!(out, "   📧 Email: {}", display.email)?;
    if let Some(phone) = &display.phone {
        writeln!(out, "   📱 Teléfono: {phone}")?;
    }
    if let Some(goal) = &display.goal {
        writeln!(out, "   🎯 Objetivo: {goal}")?;
    }
    if let Some(weight) = &display.weight {
        writeln!(out, "   ⚖️  Peso actual: {weight} kg")?;
    }
    writeln!(out, "   🆔 UID: {}", display.id)
}

fn write_summary<W: Write>(out: &mut W, count: usize) -> io::Result<()> {
    writeln!(out, "\n{}", rule())?;
    writeln!(out, "\n✅ Total: {count} usuarios/pacientes\n")
}
