//! Guard against fetch results that arrive after a newer request

use std::collections::HashMap;
use tabula_table::TableRequest;

/// One issued fetch: the request plus the sequence number it was issued under
#[derive(Debug, Clone, PartialEq)]
pub struct FetchTicket {
    pub request: TableRequest,
    pub seq: u64,
}

/// The most recent request issued for each table.
///
/// A completion is applied only when the ticket it answers is still the
/// latest one for its table; anything older is dropped. Re-issuing an
/// identical request still supersedes the earlier one.
#[derive(Debug, Clone, Default)]
pub struct LatestRequests {
    latest: HashMap<String, FetchTicket>,
    next_seq: u64,
}

impl LatestRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `request` as the latest for its table
    pub fn record(&mut self, request: TableRequest) -> FetchTicket {
        self.next_seq += 1;
        let ticket = FetchTicket {
            request,
            seq: self.next_seq,
        };
        self.latest.insert(ticket.request.tbl_id.clone(), ticket.clone());
        ticket
    }

    pub fn latest(&self, tbl_id: &str) -> Option<&TableRequest> {
        self.latest.get(tbl_id).map(|ticket| &ticket.request)
    }

    /// Whether a result for `ticket` may still be applied
    pub fn is_current(&self, ticket: &FetchTicket) -> bool {
        self.latest.get(&ticket.request.tbl_id) == Some(ticket)
    }

    pub fn forget(&mut self, tbl_id: &str) {
        self.latest.remove(tbl_id);
    }
}
