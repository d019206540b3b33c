use crate::constant::{DbFlavor, MAX_NUM_COLUMNS, MAX_PACKET_SIZE};
use crate::error::{Error, Result, eyre};
use crate::metadata::{ColumnMetadata, MetadataMode};
use crate::protocol::binary::decode_binary_row;
use crate::protocol::coldef::read_column_definition;
use crate::protocol::primitive::*;
use crate::protocol::response::{
    ERR_PACKET_HEADER, EOF_PACKET_HEADER, OK_PACKET_HEADER, OkPacket, process_err_packet,
};
use crate::protocol::text::decode_text_row;
use crate::value::Value;

/// How rows of a resultset are encoded on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultsetEncoding {
    /// COM_QUERY responses: every field a length-encoded string.
    Text,
    /// COM_STMT_EXECUTE responses: packed values behind a null bitmap.
    Binary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProcessorState {
    ReadHead,
    ReadMeta { remaining: u64 },
    ReadRows,
    Complete,
}

/// What the processor made of one server packet.
#[derive(Debug)]
pub enum ProcessorStep<'a> {
    /// The head announced a resultset with columns; column definitions follow.
    MetadataStarted { num_columns: u64 },
    /// One column definition consumed. Rows follow after the last one.
    Metadata,
    /// The packet is a row, to be decoded against the current metadata.
    Row(&'a [u8]),
    /// The current resultset ended with an OK summary. When it carried
    /// `MORE_RESULTS_EXISTS` the processor is back at the head of the next
    /// resultset; otherwise the command is complete.
    ResultsetFinished,
    /// The command was already complete; the packet was not consumed.
    Complete,
}

/// Per-command state machine consuming the server's response stream.
///
/// Sequencing: head (OK, ERR, or column count), `num_columns` column
/// definitions, rows until the terminating OK, then either the next
/// resultset's head or done. The caller feeds whole payloads and performs
/// row decoding via [`ExecutionProcessor::decode_row_into`].
#[derive(Debug)]
pub struct ExecutionProcessor {
    state: ProcessorState,
    encoding: ResultsetEncoding,
    metadata_mode: MetadataMode,
    flavor: DbFlavor,
    meta: Vec<ColumnMetadata>,
    last_ok: Option<OkPacket>,
}

impl ExecutionProcessor {
    pub fn new(
        encoding: ResultsetEncoding,
        metadata_mode: MetadataMode,
        flavor: DbFlavor,
    ) -> Self {
        Self {
            state: ProcessorState::ReadHead,
            encoding,
            metadata_mode,
            flavor,
            meta: Vec::new(),
            last_ok: None,
        }
    }

    pub fn encoding(&self) -> ResultsetEncoding {
        self.encoding
    }

    /// Metadata of the resultset currently being read.
    pub fn meta(&self) -> &[ColumnMetadata] {
        &self.meta
    }

    /// The most recent OK summary, once a resultset has finished.
    pub fn last_ok(&self) -> Option<&OkPacket> {
        self.last_ok.as_ref()
    }

    pub fn should_read_head(&self) -> bool {
        self.state == ProcessorState::ReadHead
    }

    pub fn should_read_meta(&self) -> bool {
        matches!(self.state, ProcessorState::ReadMeta { .. })
    }

    pub fn should_read_rows(&self) -> bool {
        self.state == ProcessorState::ReadRows
    }

    pub fn is_complete(&self) -> bool {
        self.state == ProcessorState::Complete
    }

    /// Feed the next server payload.
    pub fn on_packet<'a>(&mut self, payload: &'a [u8]) -> Result<ProcessorStep<'a>> {
        match self.state {
            ProcessorState::ReadHead => self.on_head(payload),
            ProcessorState::ReadMeta { remaining } => {
                let column = read_column_definition(payload, self.metadata_mode)?;
                self.meta.push(column);
                self.state = if remaining > 1 {
                    ProcessorState::ReadMeta {
                        remaining: remaining - 1,
                    }
                } else {
                    ProcessorState::ReadRows
                };
                Ok(ProcessorStep::Metadata)
            }
            ProcessorState::ReadRows => self.on_row_packet(payload),
            // terminal: report completion without consuming anything
            ProcessorState::Complete => Ok(ProcessorStep::Complete),
        }
    }

    fn on_head<'a>(&mut self, payload: &'a [u8]) -> Result<ProcessorStep<'a>> {
        let (header, data) = read_int_1(payload)?;
        match header {
            OK_PACKET_HEADER => {
                // resultset with no columns
                let ok = OkPacket::deserialize(data)?;
                self.meta.clear();
                self.finish_resultset(ok);
                Ok(ProcessorStep::ResultsetFinished)
            }
            ERR_PACKET_HEADER => Err(process_err_packet(data, self.flavor, true)),
            _ => {
                let (num_columns, rest) = read_int_lenenc(payload)?;
                check_extra_bytes(rest)?;
                if num_columns == 0 || num_columns > MAX_NUM_COLUMNS {
                    return Err(Error::ProtocolValueError);
                }
                self.meta.clear();
                self.meta.reserve(num_columns as usize);
                self.state = ProcessorState::ReadMeta {
                    remaining: num_columns,
                };
                Ok(ProcessorStep::MetadataStarted { num_columns })
            }
        }
    }

    fn on_row_packet<'a>(&mut self, payload: &'a [u8]) -> Result<ProcessorStep<'a>> {
        match payload.first() {
            None => Err(Error::IncompleteMessage),
            Some(&ERR_PACKET_HEADER) => {
                // the server may fail while generating rows
                Err(process_err_packet(&payload[1..], self.flavor, true))
            }
            // 0xFE opening a row would mean a length >= 2^24, which forces a
            // maximum-size packet; anything shorter is the terminating OK
            Some(&EOF_PACKET_HEADER) if payload.len() < MAX_PACKET_SIZE => {
                let ok = OkPacket::deserialize(&payload[1..])?;
                self.finish_resultset(ok);
                Ok(ProcessorStep::ResultsetFinished)
            }
            Some(_) => Ok(ProcessorStep::Row(payload)),
        }
    }

    fn finish_resultset(&mut self, ok: OkPacket) {
        tracing::trace!(
            affected_rows = ok.affected_rows,
            more_results = ok.more_results(),
            out_params = ok.is_out_params(),
            "resultset finished"
        );
        self.state = if ok.more_results() {
            ProcessorState::ReadHead
        } else {
            ProcessorState::Complete
        };
        self.last_ok = Some(ok);
    }

    /// Decode a row payload against the current metadata into `out`.
    pub fn decode_row_into<'a>(
        &self,
        payload: &'a [u8],
        out: &mut Vec<Value<'a>>,
    ) -> Result<()> {
        debug_assert!(!self.meta.is_empty() || self.is_complete());
        if self.meta.is_empty() {
            return Err(Error::LibraryBug(eyre!("row packet outside a resultset")));
        }
        match self.encoding {
            ResultsetEncoding::Text => decode_text_row(payload, &self.meta, out),
            ResultsetEncoding::Binary => decode_binary_row(payload, &self.meta, out),
        }
    }
}
