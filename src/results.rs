use crate::error::{Error, Result, eyre};
use crate::execution::{ExecutionProcessor, ProcessorStep};
use crate::metadata::ColumnMetadata;
use crate::protocol::response::OkPacket;
use crate::row::Row;
use crate::shape::{ColumnShape, check_meta};
use crate::value::Value;

/// One unit of a command's response: metadata (possibly empty), rows, and the
/// terminating OK summary.
#[derive(Debug, Clone)]
pub struct Resultset {
    meta: Vec<ColumnMetadata>,
    rows: Vec<Row>,
    ok: OkPacket,
}

impl Resultset {
    pub fn meta(&self) -> &[ColumnMetadata] {
        &self.meta
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn affected_rows(&self) -> u64 {
        self.ok.affected_rows
    }

    pub fn last_insert_id(&self) -> u64 {
        self.ok.last_insert_id
    }

    pub fn warnings(&self) -> u16 {
        self.ok.warnings
    }

    pub fn info(&self) -> &str {
        &self.ok.info
    }

    fn is_out_params(&self) -> bool {
        self.ok.is_out_params()
    }
}

/// The fully materialized response to a command: every resultset, with row
/// strings copied out of the network buffer.
///
/// Single-resultset accessors (`rows`, `meta`, `affected_rows`, ...) refer to
/// the first resultset.
#[derive(Debug, Clone, Default)]
pub struct QueryResults {
    resultsets: Vec<Resultset>,
    // scratch for the resultset currently being accumulated
    pending_rows: Vec<Row>,
    row_scratch_len: usize,
}

impl QueryResults {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// All resultsets, in server order.
    pub fn resultsets(&self) -> &[Resultset] {
        &self.resultsets
    }

    fn first(&self) -> Option<&Resultset> {
        self.resultsets.first()
    }

    /// Rows of the first resultset.
    pub fn rows(&self) -> &[Row] {
        self.first().map(Resultset::rows).unwrap_or(&[])
    }

    /// Metadata of the first resultset.
    pub fn meta(&self) -> &[ColumnMetadata] {
        self.first().map(Resultset::meta).unwrap_or(&[])
    }

    pub fn affected_rows(&self) -> u64 {
        self.first().map(Resultset::affected_rows).unwrap_or(0)
    }

    pub fn last_insert_id(&self) -> u64 {
        self.first().map(Resultset::last_insert_id).unwrap_or(0)
    }

    pub fn warnings(&self) -> u16 {
        self.first().map(Resultset::warnings).unwrap_or(0)
    }

    pub fn info(&self) -> &str {
        self.first().map(Resultset::info).unwrap_or("")
    }

    /// The row of the stored-procedure out-params resultset, if the command
    /// produced one with at least one row.
    pub fn out_params(&self) -> Option<&Row> {
        self.resultsets
            .iter()
            .find(|rs| rs.is_out_params())
            .and_then(|rs| rs.rows.first())
    }

    /// Validate the response against declared row shapes, one per expected
    /// resultset.
    ///
    /// A command that produced a different number of resultsets than
    /// declared fails with [`Error::NumResultsetsMismatch`]; a resultset
    /// whose metadata does not satisfy its shape fails with
    /// [`Error::MetadataCheckFailed`].
    pub fn check_shapes(&self, expected: &[&[ColumnShape]]) -> Result<()> {
        if self.resultsets.len() != expected.len() {
            return Err(Error::NumResultsetsMismatch);
        }
        for (resultset, shape) in self.resultsets.iter().zip(expected) {
            check_meta(resultset.meta(), shape)?;
        }
        Ok(())
    }

    /// Fold one processor step into the container. Returns true once the
    /// command is complete.
    pub(crate) fn absorb(
        &mut self,
        processor: &ExecutionProcessor,
        step: ProcessorStep<'_>,
    ) -> Result<bool> {
        match step {
            ProcessorStep::MetadataStarted { .. } | ProcessorStep::Metadata => {}
            ProcessorStep::Row(payload) => {
                let mut values: Vec<Value<'_>> = Vec::with_capacity(self.row_scratch_len);
                processor.decode_row_into(payload, &mut values)?;
                self.row_scratch_len = values.len();
                self.pending_rows.push(Row::from_values(&values));
            }
            ProcessorStep::ResultsetFinished => {
                let ok = processor
                    .last_ok()
                    .cloned()
                    .ok_or_else(|| Error::LibraryBug(eyre!("resultset finished without OK")))?;
                self.resultsets.push(Resultset {
                    meta: processor.meta().to_vec(),
                    rows: std::mem::take(&mut self.pending_rows),
                    ok,
                });
            }
            ProcessorStep::Complete => {}
        }
        Ok(processor.is_complete())
    }
}

/// Streaming counterpart of [`QueryResults`]: holds only the metadata of the
/// resultset currently being traversed plus the latest OK summary. Rows are
/// handed out one at a time by the connection as views into its read buffer.
#[derive(Debug)]
pub struct ExecutionState {
    pub(crate) processor: ExecutionProcessor,
}

impl ExecutionState {
    pub(crate) fn new(processor: ExecutionProcessor) -> Self {
        Self { processor }
    }

    /// Metadata of the current resultset.
    pub fn meta(&self) -> &[ColumnMetadata] {
        self.processor.meta()
    }

    /// True when the next resultset's head has yet to be read
    /// ([`read_resultset_head`](crate::sync::Conn::read_resultset_head)).
    pub fn should_read_head(&self) -> bool {
        self.processor.should_read_head()
    }

    /// True while rows of the current resultset remain to be read.
    pub fn should_read_rows(&self) -> bool {
        self.processor.should_read_rows()
    }

    /// True once the whole command has been consumed.
    pub fn complete(&self) -> bool {
        self.processor.is_complete()
    }

    /// Affected rows of the most recently finished resultset.
    pub fn affected_rows(&self) -> u64 {
        self.processor.last_ok().map(|ok| ok.affected_rows).unwrap_or(0)
    }

    /// Last insert id of the most recently finished resultset.
    pub fn last_insert_id(&self) -> u64 {
        self.processor.last_ok().map(|ok| ok.last_insert_id).unwrap_or(0)
    }

    /// Warning count of the most recently finished resultset.
    pub fn warnings(&self) -> u16 {
        self.processor.last_ok().map(|ok| ok.warnings).unwrap_or(0)
    }

    /// Info string of the most recently finished resultset.
    pub fn info(&self) -> &str {
        self.processor.last_ok().map(|ok| ok.info.as_str()).unwrap_or("")
    }

    /// Whether the most recently finished resultset carried OUT parameters.
    pub fn is_out_params(&self) -> bool {
        self.processor
            .last_ok()
            .map(|ok| ok.is_out_params())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constant::{ColumnFlags, DbFlavor, ProtocolFieldType, ServerStatusFlags};
    use crate::execution::ResultsetEncoding;
    use crate::metadata::MetadataMode;
    use crate::protocol::primitive::{write_int_lenenc, write_string_lenenc};
    use crate::testutil::{coldef_payload, meta, ok_payload};

    fn drive(processor: &mut ExecutionProcessor, results: &mut QueryResults, payload: &[u8]) -> bool {
        let step = processor.on_packet(payload).unwrap();
        results.absorb(processor, step).unwrap()
    }

    #[test]
    fn accumulates_three_resultsets_in_order() {
        let mut processor = ExecutionProcessor::new(
            ResultsetEncoding::Text,
            MetadataMode::Full,
            DbFlavor::Mysql,
        );
        let mut results = QueryResults::new();
        let more = ServerStatusFlags::SERVER_MORE_RESULTS_EXISTS.bits();
        let column = meta(ProtocolFieldType::VarString, ColumnFlags::empty(), 33, 0);

        // resultset 1: one row
        let mut head = Vec::new();
        write_int_lenenc(&mut head, 1);
        assert!(!drive(&mut processor, &mut results, &head));
        assert!(!drive(&mut processor, &mut results, &coldef_payload(&column)));
        let mut row = Vec::new();
        write_string_lenenc(&mut row, "a");
        assert!(!drive(&mut processor, &mut results, &row));
        assert!(!drive(
            &mut processor,
            &mut results,
            &ok_payload(0xFE, 0, 0, more, 0, "")
        ));

        // resultset 2: empty
        assert!(!drive(
            &mut processor,
            &mut results,
            &ok_payload(0x00, 7, 0, more, 0, "two")
        ));

        // resultset 3: one row, final
        assert!(!drive(&mut processor, &mut results, &head));
        assert!(!drive(&mut processor, &mut results, &coldef_payload(&column)));
        let mut row = Vec::new();
        write_string_lenenc(&mut row, "c");
        assert!(!drive(&mut processor, &mut results, &row));
        assert!(drive(
            &mut processor,
            &mut results,
            &ok_payload(0xFE, 0, 0, 0, 0, "")
        ));

        assert_eq!(results.resultsets().len(), 3);
        assert_eq!(results.rows().len(), 1);
        assert_eq!(results.rows()[0].field(0), Some(Value::Bytes(b"a")));
        assert_eq!(results.resultsets()[1].rows().len(), 0);
        assert_eq!(results.resultsets()[1].affected_rows(), 7);
        assert_eq!(results.resultsets()[1].info(), "two");
        assert_eq!(
            results.resultsets()[2].rows()[0].field(0),
            Some(Value::Bytes(b"c"))
        );
        assert!(results.out_params().is_none());
    }

    #[test]
    fn out_params_resultset_is_tagged() {
        let mut processor = ExecutionProcessor::new(
            ResultsetEncoding::Binary,
            MetadataMode::Full,
            DbFlavor::Mysql,
        );
        let mut results = QueryResults::new();
        let more = ServerStatusFlags::SERVER_MORE_RESULTS_EXISTS.bits();
        let out_flags = ServerStatusFlags::SERVER_PS_OUT_PARAMS.bits() | more;
        let column = meta(ProtocolFieldType::Longlong, ColumnFlags::empty(), 63, 0);

        let mut head = Vec::new();
        write_int_lenenc(&mut head, 1);
        drive(&mut processor, &mut results, &head);
        drive(&mut processor, &mut results, &coldef_payload(&column));
        let mut row = vec![0x00, 0x00];
        row.extend_from_slice(&41i64.to_le_bytes());
        drive(&mut processor, &mut results, &row);
        drive(
            &mut processor,
            &mut results,
            &ok_payload(0xFE, 0, 0, out_flags, 0, ""),
        );
        assert!(drive(
            &mut processor,
            &mut results,
            &ok_payload(0x00, 0, 0, 0, 0, "")
        ));

        let out = results.out_params().unwrap();
        assert_eq!(out.field(0), Some(Value::Int(41)));
    }

    #[test]
    fn shape_checks_resultset_count_and_metadata() {
        use crate::constant::ColumnType;

        let mut processor = ExecutionProcessor::new(
            ResultsetEncoding::Text,
            MetadataMode::Full,
            DbFlavor::Mysql,
        );
        let mut results = QueryResults::new();
        let column = meta(ProtocolFieldType::VarString, ColumnFlags::NOT_NULL_FLAG, 33, 0);

        let mut head = Vec::new();
        write_int_lenenc(&mut head, 1);
        drive(&mut processor, &mut results, &head);
        drive(&mut processor, &mut results, &coldef_payload(&column));
        let mut row = Vec::new();
        write_string_lenenc(&mut row, "a");
        drive(&mut processor, &mut results, &row);
        assert!(drive(
            &mut processor,
            &mut results,
            &ok_payload(0xFE, 0, 0, 0, 0, "")
        ));

        let shape = [ColumnShape::named("c", ColumnType::Varchar)];
        results.check_shapes(&[&shape]).unwrap();

        assert!(matches!(
            results.check_shapes(&[&shape, &shape]),
            Err(Error::NumResultsetsMismatch)
        ));
        let wrong = [ColumnShape::named("c", ColumnType::Bigint)];
        assert!(matches!(
            results.check_shapes(&[&wrong]),
            Err(Error::MetadataCheckFailed(_))
        ));
    }

    #[test]
    fn out_params_with_zero_rows_is_tolerated() {
        let mut processor = ExecutionProcessor::new(
            ResultsetEncoding::Binary,
            MetadataMode::Full,
            DbFlavor::Mysql,
        );
        let mut results = QueryResults::new();
        let out_flags = ServerStatusFlags::SERVER_PS_OUT_PARAMS.bits();
        assert!(drive(
            &mut processor,
            &mut results,
            &ok_payload(0x00, 0, 0, out_flags, 0, "")
        ));
        assert!(results.out_params().is_none());
    }
}
