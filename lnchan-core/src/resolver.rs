use std::sync::Arc;

use log::*;

use crate::error::ResolutionError;
use crate::invoice::{Bolt11Decoder, InvoiceDecoder};
use crate::model::NodeId;

/// Operator input, parsed but not yet resolved to an address
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedTarget {
    /// The remote node
    pub node_id: NodeId,
    /// Whatever followed the `@` of a connection string, not validated yet
    pub rest: Option<String>,
}

// What a parse attempt found before node id validation
struct Candidate {
    node_id_hex: String,
    rest: Option<String>,
}

enum Attempt {
    Matched(Candidate),
    NoMatch(String),
}

type AttemptFn = fn(&ConnectionResolver, &str) -> Attempt;

/// Parses the three input forms an operator may use to name a peer:
/// - a connection string, `<node_id_hex>@<host>:<port>`
/// - an invoice, naming the payee
/// - a bare hex node id
///
/// The forms are tried in that order and the first match wins.  The node id is
/// validated only afterwards, so an invalid node id in a connection string is
/// reported as such and never reinterpreted as another form.
///
/// This does no I/O.
pub struct ConnectionResolver {
    decoder: Arc<dyn InvoiceDecoder>,
}

impl ConnectionResolver {
    /// Create a resolver using the given invoice decoder
    pub fn new(decoder: Arc<dyn InvoiceDecoder>) -> Self {
        ConnectionResolver { decoder }
    }

    /// Create a resolver that understands BOLT-11 invoices
    pub fn bolt11() -> Self {
        Self::new(Arc::new(Bolt11Decoder))
    }

    /// Parse operator input into a node id and an optional unvalidated `host:port`
    pub fn resolve_input(&self, text: &str) -> Result<ParsedTarget, ResolutionError> {
        let candidate = self.candidate(text.trim());
        let node_id = NodeId::from_hex(&candidate.node_id_hex)?;
        Ok(ParsedTarget { node_id, rest: candidate.rest })
    }

    fn candidate(&self, text: &str) -> Candidate {
        let attempts: [(&str, AttemptFn); 2] = [
            ("connection string", Self::as_connection_string),
            ("invoice", Self::as_invoice),
        ];
        for (name, attempt) in attempts {
            match attempt(self, text) {
                Attempt::Matched(candidate) => {
                    debug!("input parsed as {}", name);
                    return candidate;
                }
                Attempt::NoMatch(reason) => trace!("input is not {}: {}", name, reason),
            }
        }
        debug!("input taken as a bare node id");
        Candidate { node_id_hex: text.to_string(), rest: None }
    }

    fn as_connection_string(&self, text: &str) -> Attempt {
        let mut parts = text.split('@');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(node_id_hex), Some(rest), None) => Attempt::Matched(Candidate {
                node_id_hex: node_id_hex.trim().to_string(),
                rest: Some(rest.trim().to_string()),
            }),
            (_, None, _) => Attempt::NoMatch("no @".to_string()),
            _ => Attempt::NoMatch("more than one @".to_string()),
        }
    }

    fn as_invoice(&self, text: &str) -> Attempt {
        match self.decoder.decode(text) {
            Ok(invoice) => Attempt::Matched(Candidate {
                node_id_hex: hex::encode(invoice.pubkey_bytes()),
                rest: None,
            }),
            Err(e) => Attempt::NoMatch(e.to_string()),
        }
    }
}
