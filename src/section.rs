//! Section-constrained position iteration.
//!
//! Sections divide a document's content into spans (sentences, paragraphs)
//! so phrase-style matching can be restricted to one span. Each indexed
//! position may carry a payload encoding the section it belongs to;
//! [`SectionPositionIterator`] walks the positions of one term in one
//! document and decodes those section IDs on demand.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Result, SagittaError};
use crate::reader::{PositionIterator, SegmentReader};

/// Sentinel returned by [`SectionPositionIterator::next_position`] once all
/// positions are consumed.
pub const NO_MORE_POSITIONS: u64 = u64::MAX;

/// Section ID of a position that carries no section payload.
pub const NO_SECTION: i64 = -1;

/// Sentinel returned by [`SectionPositionIterator::fetch_section`] once all
/// positions are consumed.
pub const NO_MORE_SECTIONS: i64 = i64::MAX;

/// Decode a section ID from position payload bytes.
///
/// The payload length selects the decoded width: an empty payload carries no
/// section ([`NO_SECTION`]), a single byte always decodes to section 0, and
/// longer payloads decode one to four leading data bytes as a little-endian
/// unsigned integer. Lengths above five are rejected.
pub fn decode_section_id(payload: &[u8]) -> Result<i64> {
    match payload.len() {
        0 => Ok(NO_SECTION),
        1 => Ok(0),
        2 => Ok(payload[0] as i64),
        3 => Ok(LittleEndian::read_u16(&payload[..2]) as i64),
        4 => Ok(LittleEndian::read_u24(&payload[..3]) as i64),
        5 => Ok(LittleEndian::read_u32(&payload[..4]) as i64),
        n => Err(SagittaError::section(format!(
            "unsupported section payload length: {}",
            n
        ))),
    }
}

/// Iterator over the positions of one term in one document, decoding the
/// section ID attached to each position.
///
/// The iterator is forward-only and single-consumer. Positions are tracked
/// by an explicit remaining count initialized from the document's term
/// frequency, so the underlying source is never advanced past its end.
#[derive(Debug)]
pub struct SectionPositionIterator {
    positions: Box<dyn PositionIterator>,
    positions_left: u64,
    current_position: u64,
    current_section: i64,
}

impl SectionPositionIterator {
    /// Create an iterator over the given position source.
    pub fn new(positions: Box<dyn PositionIterator>) -> Self {
        let positions_left = positions.term_freq();
        SectionPositionIterator {
            positions,
            positions_left,
            current_position: 0,
            current_section: NO_SECTION,
        }
    }

    /// Get the current position. Valid after a successful
    /// [`next_position`](Self::next_position).
    pub fn position(&self) -> u64 {
        self.current_position
    }

    /// Get the most recently decoded section ID.
    pub fn section_id(&self) -> i64 {
        self.current_section
    }

    /// Get the number of positions not yet consumed.
    pub fn positions_left(&self) -> u64 {
        self.positions_left
    }

    /// Move to the next position and return it, or [`NO_MORE_POSITIONS`]
    /// once all positions are consumed.
    pub fn next_position(&mut self) -> Result<u64> {
        if self.positions_left > 0 {
            self.current_position = self.positions.next_position()?;
            self.positions_left -= 1;
            Ok(self.current_position)
        } else {
            self.current_position = NO_MORE_POSITIONS;
            Ok(NO_MORE_POSITIONS)
        }
    }

    /// Decode the section ID at the current position.
    pub fn read_section_id(&mut self) -> Result<i64> {
        self.current_section = match self.positions.payload() {
            Some(payload) => decode_section_id(payload)?,
            None => NO_SECTION,
        };
        Ok(self.current_section)
    }

    /// Consume positions until one's section ID is >= `target` and return
    /// that section ID.
    ///
    /// Returns [`NO_MORE_SECTIONS`] once positions run out, on that call and
    /// on every call after it.
    pub fn fetch_section(&mut self, target: i64) -> Result<i64> {
        while self.positions_left > 0 {
            self.current_position = self.positions.next_position()?;
            self.positions_left -= 1;
            if self.read_section_id()? >= target {
                return Ok(self.current_section);
            }
        }
        self.current_section = NO_MORE_SECTIONS;
        Ok(NO_MORE_SECTIONS)
    }
}

/// Open a section position iterator for a term in a document, or `None` if
/// the document does not contain the term.
pub fn section_positions(
    reader: &dyn SegmentReader,
    field: &str,
    term: &str,
    doc_id: u64,
) -> Result<Option<SectionPositionIterator>> {
    let positions = reader.positions(field, term, doc_id)?;
    Ok(positions.map(SectionPositionIterator::new))
}
