//! Hand-rolled byte state machine over {FieldStart, Field, QuotedField,
//! QuoteInQuotedField, Cr}. No third-party CSV crate: this is the one
//! piece meant to exercise the buffer model end-to-end, byte by byte.

use std::collections::HashSet;
use std::sync::Arc;

use crate::common::config::ParseConfig;
use crate::common::error::{EngineError, EngineResult};
use crate::csv::decode::{decode_field, is_null_literal, zero_default};
use crate::types::chunk::Chunk;
use crate::types::column_buffer::ColumnBuffer;
use crate::types::dictionary::Dictionary;
use crate::types::physical_type::Kind;
use crate::types::schema::Schema;
use crate::types::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    FieldStart,
    Field,
    QuotedField,
    QuoteInQuotedField,
    Cr,
}

/// Incrementally tokenizes and decodes CSV bytes into [`Chunk`]s matching a
/// fixed target `Schema`. Feed it bytes as they arrive (`feed`); partial
/// fields that straddle a feed boundary are retained internally. Call
/// `finish` once after the last byte to flush any trailing partial row.
pub struct CsvTokenizer {
    schema: Arc<Schema>,
    options: ParseConfig,
    state: State,
    field_buf: Vec<u8>,
    current_csv_col: usize,
    header_done: bool,
    header_names: Vec<String>,
    output_col_for_csv_col: Vec<Option<usize>>,
    columns: Vec<ColumnBuffer>,
    dictionary: Dictionary,
    row_touched: Vec<bool>,
    row_pending_skip: bool,
    rows_to_skip: usize,
    row_count_in_chunk: usize,
    total_rows_emitted: usize,
    byte_offset: usize,
    done: bool,
    ready: Vec<Chunk>,
}

impl CsvTokenizer {
    pub fn new(schema: Arc<Schema>, options: ParseConfig) -> Self {
        let width = schema.len();
        let no_header_mapping = (!options.has_header).then(|| (0..width).map(Some).collect::<Vec<_>>());
        let columns = fresh_columns(&schema, options.chunk_size);
        let rows_to_skip = options.skip_rows;
        Self {
            output_col_for_csv_col: no_header_mapping.unwrap_or_default(),
            header_done: !options.has_header,
            row_pending_skip: rows_to_skip > 0,
            row_touched: vec![false; width],
            columns,
            dictionary: Dictionary::new(),
            header_names: Vec::new(),
            current_csv_col: 0,
            row_count_in_chunk: 0,
            total_rows_emitted: 0,
            byte_offset: 0,
            done: false,
            ready: Vec::new(),
            field_buf: Vec::new(),
            state: State::FieldStart,
            rows_to_skip,
            schema,
            options,
        }
    }

    /// Feeds a chunk of raw CSV bytes, returning any fully completed
    /// output chunks (`options.chunk_size` rows each).
    pub fn feed(&mut self, bytes: &[u8]) -> EngineResult<Vec<Chunk>> {
        for &b in bytes {
            if self.done {
                break;
            }
            self.byte_offset += 1;
            self.step(b)?;
        }
        Ok(std::mem::take(&mut self.ready))
    }

    /// Flushes any trailing partial row (a file with no final newline) and
    /// the last, possibly short, chunk. Returns an error if the input ends
    /// mid-quoted-field.
    pub fn finish(&mut self) -> EngineResult<Option<Chunk>> {
        if self.state == State::QuotedField {
            return Err(EngineError::UnclosedQuote { byte_offset: self.byte_offset });
        }
        if !self.field_buf.is_empty() || self.current_csv_col > 0 || self.state == State::QuoteInQuotedField {
            self.end_field()?;
            self.end_row()?;
        }
        self.state = State::FieldStart;
        if self.row_count_in_chunk > 0 {
            return Ok(Some(self.build_chunk()?));
        }
        Ok(None)
    }

    fn step(&mut self, b: u8) -> EngineResult<()> {
        if self.state == State::Cr {
            self.state = State::FieldStart;
            if b == b'\n' {
                return Ok(());
            }
            return self.step(b);
        }
        if b == self.options.quote && self.state == State::FieldStart {
            self.state = State::QuotedField;
            return Ok(());
        }
        match self.state {
            State::FieldStart | State::Field => match b {
                d if d == self.options.delimiter => {
                    self.end_field()?;
                    self.state = State::FieldStart;
                }
                b'\n' => {
                    self.end_field()?;
                    self.end_row()?;
                    self.state = State::FieldStart;
                }
                b'\r' => {
                    self.end_field()?;
                    self.end_row()?;
                    self.state = State::Cr;
                }
                other => {
                    self.field_buf.push(other);
                    self.state = State::Field;
                }
            },
            State::QuotedField => {
                if b == self.options.quote {
                    self.state = State::QuoteInQuotedField;
                } else {
                    self.field_buf.push(b);
                }
            }
            State::QuoteInQuotedField => match b {
                q if q == self.options.quote => {
                    self.field_buf.push(q);
                    self.state = State::QuotedField;
                }
                d if d == self.options.delimiter => {
                    self.end_field()?;
                    self.state = State::FieldStart;
                }
                b'\n' => {
                    self.end_field()?;
                    self.end_row()?;
                    self.state = State::FieldStart;
                }
                b'\r' => {
                    self.end_field()?;
                    self.end_row()?;
                    self.state = State::Cr;
                }
                other => {
                    // trailing bytes after a closing quote; lenient mode
                    // folds them into the field rather than erroring.
                    self.field_buf.push(other);
                    self.state = State::Field;
                }
            },
            State::Cr => unreachable!(),
        }
        Ok(())
    }

    fn end_field(&mut self) -> EngineResult<()> {
        let field = std::mem::take(&mut self.field_buf);
        if !self.header_done {
            self.header_names.push(String::from_utf8_lossy(&field).into_owned());
        } else if !self.done && !self.row_pending_skip {
            if let Some(out_col) = self.output_col_for_csv_col.get(self.current_csv_col).copied().flatten() {
                self.write_field(out_col, &field)?;
                self.row_touched[out_col] = true;
            }
        }
        self.current_csv_col += 1;
        Ok(())
    }

    fn end_row(&mut self) -> EngineResult<()> {
        self.current_csv_col = 0;
        if !self.header_done {
            self.resolve_projection()?;
            self.header_done = true;
            self.header_names.clear();
            self.row_pending_skip = self.rows_to_skip > 0;
            return Ok(());
        }
        if self.done {
            return Ok(());
        }
        if self.row_pending_skip {
            self.rows_to_skip -= 1;
            self.row_pending_skip = self.rows_to_skip > 0;
            return Ok(());
        }

        for out_col in 0..self.schema.len() {
            if !self.row_touched[out_col] {
                self.write_missing(out_col)?;
            }
            self.row_touched[out_col] = false;
        }
        self.row_count_in_chunk += 1;
        self.total_rows_emitted += 1;
        if let Some(max) = self.options.max_rows {
            if self.total_rows_emitted >= max {
                self.done = true;
            }
        }
        self.row_pending_skip = !self.done && self.rows_to_skip > 0;
        if self.row_count_in_chunk >= self.options.chunk_size {
            self.ready.push(self.build_chunk()?);
        }
        Ok(())
    }

    fn write_field(&mut self, out_col: usize, field: &[u8]) -> EngineResult<()> {
        let descriptor = self.schema.column(out_col).unwrap().clone();
        if field.is_empty() || is_null_literal(field, &self.options.null_literals) {
            return self.write_missing(out_col);
        }
        if descriptor.dtype.kind == Kind::String {
            let text = String::from_utf8_lossy(field);
            let id = self.dictionary.intern(&text);
            self.columns[out_col].push_dict_id(Some(id))?;
        } else {
            let row = self.total_rows_emitted;
            let value = decode_field(field, descriptor.dtype.kind, descriptor.name.as_ref(), row)?;
            self.columns[out_col].push(&value)?;
        }
        Ok(())
    }

    /// An empty/null-literal field, or a data row shorter than the schema:
    /// null for a nullable column, the type's zero default otherwise.
    fn write_missing(&mut self, out_col: usize) -> EngineResult<()> {
        let descriptor = self.schema.column(out_col).unwrap().clone();
        if descriptor.dtype.nullable {
            if descriptor.dtype.kind == Kind::String {
                self.columns[out_col].push_dict_id(None)
            } else {
                self.columns[out_col].push(&Value::Null)
            }
        } else if descriptor.dtype.kind == Kind::String {
            let id = self.dictionary.intern("");
            self.columns[out_col].push_dict_id(Some(id))
        } else {
            self.columns[out_col].push(&zero_default(descriptor.dtype.kind))
        }
    }

    fn resolve_projection(&mut self) -> EngineResult<()> {
        let wanted: Option<HashSet<&str>> = self.options.projection.as_ref().map(|v| v.iter().map(String::as_str).collect());
        let mut mapping = vec![None; self.header_names.len()];
        let mut matched = HashSet::new();
        for (i, name) in self.header_names.iter().enumerate() {
            if let Some(out_col) = self.schema.index_of(name) {
                if wanted.as_ref().map(|w| w.contains(name.as_str())).unwrap_or(true) {
                    mapping[i] = Some(out_col);
                    matched.insert(out_col);
                }
            }
        }
        let required: Vec<usize> = match &wanted {
            Some(w) => (0..self.schema.len()).filter(|&i| w.contains(self.schema.column(i).unwrap().name.as_ref())).collect(),
            None => (0..self.schema.len()).collect(),
        };
        for idx in required {
            if !matched.contains(&idx) {
                return Err(EngineError::SchemaMismatch {
                    expected: self.schema.column(idx).unwrap().name.to_string(),
                    found: "missing from CSV header".to_string(),
                });
            }
        }
        self.output_col_for_csv_col = mapping;
        Ok(())
    }

    fn build_chunk(&mut self) -> EngineResult<Chunk> {
        let columns = std::mem::replace(&mut self.columns, fresh_columns(&self.schema, self.options.chunk_size));
        self.row_count_in_chunk = 0;
        Chunk::new(self.schema.clone(), columns, self.dictionary.clone())
    }
}

fn fresh_columns(schema: &Schema, chunk_size: usize) -> Vec<ColumnBuffer> {
    schema.columns().iter().map(|d| ColumnBuffer::with_capacity(d.dtype.kind, d.dtype.nullable, chunk_size)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::dtype::DType;
    use crate::types::schema::ColumnDescriptor;

    fn schema() -> Arc<Schema> {
        Arc::new(
            Schema::new(vec![
                ColumnDescriptor::new("id", DType::not_null(Kind::Int32)),
                ColumnDescriptor::new("name", DType::nullable(Kind::String)),
            ])
            .unwrap(),
        )
    }

    #[test]
    fn parses_header_and_two_rows() {
        let mut tok = CsvTokenizer::new(schema(), ParseConfig::default());
        let mut chunks = tok.feed(b"id,name\n1,alice\n2,bob\n").unwrap();
        chunks.extend(tok.finish().unwrap());
        let total: usize = chunks.iter().map(|c| c.row_count()).sum();
        assert_eq!(total, 2);
        let chunk = &chunks[0];
        assert_eq!(chunk.columns()[0].get_raw::<i32>(0), Some(1));
        let name_id = chunk.columns()[1].get_dict_id(0).unwrap();
        assert_eq!(chunk.dictionary().get(name_id), Some("alice"));
    }

    #[test]
    fn handles_quoted_fields_with_embedded_delimiter_and_escaped_quote() {
        let mut tok = CsvTokenizer::new(schema(), ParseConfig::default());
        let mut chunks = tok.feed(b"id,name\n1,\"smith, \"\"the man\"\"\"\n").unwrap();
        chunks.extend(tok.finish().unwrap());
        let chunk = &chunks[0];
        let name_id = chunk.columns()[1].get_dict_id(0).unwrap();
        assert_eq!(chunk.dictionary().get(name_id), Some("smith, \"the man\""));
    }

    #[test]
    fn empty_field_is_null_for_nullable_column() {
        let mut tok = CsvTokenizer::new(schema(), ParseConfig::default());
        let mut chunks = tok.feed(b"id,name\n1,\n").unwrap();
        chunks.extend(tok.finish().unwrap());
        let chunk = &chunks[0];
        assert!(chunk.columns()[1].get_dict_id(0).is_none());
    }

    #[test]
    fn unclosed_quote_at_eof_errors() {
        let mut tok = CsvTokenizer::new(schema(), ParseConfig::default());
        tok.feed(b"id,name\n1,\"oops").unwrap();
        assert!(matches!(tok.finish(), Err(EngineError::UnclosedQuote { .. })));
    }

    #[test]
    fn chunk_boundary_splits_output_at_configured_chunk_size() {
        let mut options = ParseConfig::default();
        options.chunk_size = 1;
        let mut tok = CsvTokenizer::new(schema(), options);
        let mut chunks = tok.feed(b"id,name\n1,a\n2,b\n3,c\n").unwrap();
        chunks.extend(tok.finish().unwrap());
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.row_count() == 1));
    }

    #[test]
    fn feed_across_a_split_field_boundary_reassembles_correctly() {
        let mut tok = CsvTokenizer::new(schema(), ParseConfig::default());
        let mut chunks = tok.feed(b"id,na").unwrap();
        chunks.extend(tok.feed(b"me\n1,alice\n").unwrap());
        chunks.extend(tok.finish().unwrap());
        let total: usize = chunks.iter().map(|c| c.row_count()).sum();
        assert_eq!(total, 1);
    }
}
