use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use chrono::{Duration as ChronoDuration, NaiveDate};
use parquet::basic::{LogicalType, Repetition, Type as PhysicalType};
use parquet::column::writer::ColumnWriter;
use parquet::data_type::ByteArray;
use parquet::file::properties::WriterProperties;
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::file::writer::SerializedFileWriter;
use parquet::record::Field;
use parquet::schema::types::Type;
use sha2::{Digest, Sha256};

use crate::table::{Datum, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Bool,
    Int64,
    Double,
    Date,
    Utf8,
}

/// Picks the narrowest physical type that holds every non-null cell.
pub fn infer_kind<'a>(values: impl Iterator<Item = &'a Datum>) -> ColumnKind {
    let mut kind: Option<ColumnKind> = None;
    for value in values {
        let this = match value {
            v if v.is_null() => continue,
            Datum::Bool(_) => ColumnKind::Bool,
            Datum::Int(_) => ColumnKind::Int64,
            Datum::Float(_) => ColumnKind::Double,
            Datum::Date(_) => ColumnKind::Date,
            _ => ColumnKind::Utf8,
        };
        kind = Some(match (kind, this) {
            (None, k) => k,
            (Some(a), b) if a == b => a,
            (Some(ColumnKind::Int64), ColumnKind::Double)
            | (Some(ColumnKind::Double), ColumnKind::Int64) => ColumnKind::Double,
            _ => return ColumnKind::Utf8,
        });
    }
    kind.unwrap_or(ColumnKind::Utf8)
}

fn column_type(name: &str, kind: ColumnKind) -> Result<Type> {
    let (physical, logical) = match kind {
        ColumnKind::Bool => (PhysicalType::BOOLEAN, None),
        ColumnKind::Int64 => (PhysicalType::INT64, None),
        ColumnKind::Double => (PhysicalType::DOUBLE, None),
        ColumnKind::Date => (PhysicalType::INT32, Some(LogicalType::Date)),
        ColumnKind::Utf8 => (PhysicalType::BYTE_ARRAY, Some(LogicalType::String)),
    };
    Type::primitive_type_builder(name, physical)
        .with_repetition(Repetition::OPTIONAL)
        .with_logical_type(logical)
        .build()
        .with_context(|| format!("schema for column {name}"))
}

/// Writes `table` as a single row group, replacing whatever was at `path`.
/// The same table always yields the same bytes.
pub fn write_table(table: &Table, path: &Path) -> Result<()> {
    if table.columns().is_empty() {
        return Err(anyhow!("refusing to write {}: table has no columns", path.display()));
    }
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }

    let kinds: Vec<ColumnKind> = (0..table.columns().len())
        .map(|i| infer_kind(table.rows().iter().map(|r| &r[i])))
        .collect();
    let mut fields = Vec::with_capacity(kinds.len());
    for (name, kind) in table.columns().iter().zip(kinds.iter()) {
        fields.push(Arc::new(column_type(name, *kind)?));
    }
    let schema = Type::group_type_builder("schema")
        .with_fields(fields)
        .build()
        .context("build parquet schema")?;

    let tmp = path.with_extension("parquet.tmp");
    let written = write_row_group(table, &kinds, schema, &tmp)
        .and_then(|()| fs::rename(&tmp, path).with_context(|| format!("swap {}", path.display())));
    if written.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    written
}

fn write_row_group(table: &Table, kinds: &[ColumnKind], schema: Type, tmp: &Path) -> Result<()> {
    let file = File::create(tmp).with_context(|| format!("create {}", tmp.display()))?;
    let props = Arc::new(WriterProperties::builder().build());
    let mut writer =
        SerializedFileWriter::new(file, Arc::new(schema), props).context("open parquet writer")?;

    let mut row_group = writer.next_row_group().context("start row group")?;
    let mut idx = 0usize;
    while let Some(mut column) = row_group.next_column().context("next column")? {
        let kind = kinds
            .get(idx)
            .copied()
            .ok_or_else(|| anyhow!("writer asked for unknown column {idx}"))?;
        let cells: Vec<&Datum> = table.rows().iter().map(|r| &r[idx]).collect();
        write_column(column.untyped(), kind, &cells)
            .with_context(|| format!("write column {}", table.columns()[idx]))?;
        column.close().context("close column")?;
        idx += 1;
    }
    row_group.close().context("close row group")?;
    writer.close().context("finish parquet file")?;
    Ok(())
}

fn write_column(writer: &mut ColumnWriter<'_>, kind: ColumnKind, cells: &[&Datum]) -> Result<()> {
    let defs: Vec<i16> = cells.iter().map(|c| if c.is_null() { 0 } else { 1 }).collect();
    let present = || cells.iter().filter(|c| !c.is_null());

    match (writer, kind) {
        (ColumnWriter::BoolColumnWriter(w), ColumnKind::Bool) => {
            let values: Vec<bool> = present()
                .filter_map(|c| match c {
                    Datum::Bool(b) => Some(*b),
                    _ => None,
                })
                .collect();
            w.write_batch(&values, Some(&defs), None)?;
        }
        (ColumnWriter::Int64ColumnWriter(w), ColumnKind::Int64) => {
            let values: Vec<i64> = present().filter_map(|c| c.as_i64()).collect();
            w.write_batch(&values, Some(&defs), None)?;
        }
        (ColumnWriter::DoubleColumnWriter(w), ColumnKind::Double) => {
            let values: Vec<f64> = present().filter_map(|c| c.as_f64()).collect();
            w.write_batch(&values, Some(&defs), None)?;
        }
        (ColumnWriter::Int32ColumnWriter(w), ColumnKind::Date) => {
            let values: Vec<i32> = present()
                .filter_map(|c| c.as_date())
                .map(days_since_epoch)
                .collect();
            w.write_batch(&values, Some(&defs), None)?;
        }
        (ColumnWriter::ByteArrayColumnWriter(w), ColumnKind::Utf8) => {
            let values: Vec<ByteArray> = present()
                .map(|c| ByteArray::from(plain_text(c).as_str()))
                .collect();
            w.write_batch(&values, Some(&defs), None)?;
        }
        (_, kind) => return Err(anyhow!("column writer does not match {kind:?}")),
    }
    Ok(())
}

/// Text form used when a column falls back to strings. Unlike `Display`,
/// floats keep full precision.
fn plain_text(value: &Datum) -> String {
    match value {
        Datum::Float(v) => v.to_string(),
        other => other.to_string(),
    }
}

// 1970-01-01, the zero point of the Parquet DATE type.
fn epoch() -> NaiveDate {
    NaiveDate::default()
}

fn days_since_epoch(date: NaiveDate) -> i32 {
    (date - epoch()).num_days() as i32
}

fn date_from_days(days: i32) -> Option<NaiveDate> {
    epoch().checked_add_signed(ChronoDuration::days(days as i64))
}

pub fn read_table(path: &Path) -> Result<Table> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let reader = SerializedFileReader::new(file)
        .with_context(|| format!("open parquet reader {}", path.display()))?;
    let columns: Vec<String> = reader
        .metadata()
        .file_metadata()
        .schema_descr()
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();

    let mut table = Table::new(columns);
    let iter = reader.get_row_iter(None).context("iterate parquet rows")?;
    for row in iter {
        let row = row.context("decode parquet row")?;
        let cells = row
            .get_column_iter()
            .map(|(_, field)| field_to_datum(field))
            .collect();
        table.push_row(cells)?;
    }
    Ok(table)
}

fn field_to_datum(field: &Field) -> Datum {
    match field {
        Field::Null => Datum::Null,
        Field::Bool(b) => Datum::Bool(*b),
        Field::Byte(v) => Datum::Int(*v as i64),
        Field::Short(v) => Datum::Int(*v as i64),
        Field::Int(v) => Datum::Int(*v as i64),
        Field::Long(v) => Datum::Int(*v),
        Field::UByte(v) => Datum::Int(*v as i64),
        Field::UShort(v) => Datum::Int(*v as i64),
        Field::UInt(v) => Datum::Int(*v as i64),
        Field::ULong(v) => i64::try_from(*v).map(Datum::Int).unwrap_or(Datum::Float(*v as f64)),
        Field::Float(v) => Datum::Float(*v as f64),
        Field::Double(v) => Datum::Float(*v),
        Field::Str(s) => Datum::Text(s.clone()),
        Field::Date(d) => date_from_days(*d).map(Datum::Date).unwrap_or(Datum::Null),
        other => Datum::Text(other.to_string()),
    }
}

/// Hex SHA-256 of a file, used to show that two runs wrote the same bytes.
pub fn file_digest(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let digest = Sha256::digest(&bytes);
    Ok(digest.iter().map(|b| format!("{b:02x}")).collect())
}
