use core::str::FromStr;

use bitcoin::secp256k1::PublicKey;
use lightning_invoice::Bolt11Invoice;

use crate::error::DecodeError;
use crate::model::NodeId;

/// The part of a decoded invoice we care about: who gets paid
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedInvoice {
    payee: NodeId,
}

impl DecodedInvoice {
    /// Construct from the payee's serialized public key
    pub fn new(payee: [u8; 33]) -> Self {
        DecodedInvoice { payee: NodeId::new(payee) }
    }

    /// Construct from the payee's public key
    pub fn from_pubkey(payee: PublicKey) -> Self {
        DecodedInvoice { payee: NodeId::from(payee) }
    }

    /// Payee's public key, serialized compressed
    pub fn pubkey_bytes(&self) -> [u8; 33] {
        *self.payee.as_bytes()
    }

    /// Payee as a node id
    pub fn payee_node_id(&self) -> NodeId {
        self.payee
    }
}

/// Turns text into an invoice
pub trait InvoiceDecoder: Send + Sync {
    /// Decode an invoice.  Failure just means the text is not an invoice.
    fn decode(&self, text: &str) -> Result<DecodedInvoice, DecodeError>;
}

/// BOLT-11 invoices.  Signature and semantic checks are done by `lightning-invoice`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Bolt11Decoder;

impl InvoiceDecoder for Bolt11Decoder {
    fn decode(&self, text: &str) -> Result<DecodedInvoice, DecodeError> {
        let invoice = Bolt11Invoice::from_str(text).map_err(|e| DecodeError(e.to_string()))?;
        // the payee key is only explicit if the `n` field is present
        let payee =
            invoice.payee_pub_key().cloned().unwrap_or_else(|| invoice.recover_payee_pub_key());
        Ok(DecodedInvoice::from_pubkey(payee))
    }
}
