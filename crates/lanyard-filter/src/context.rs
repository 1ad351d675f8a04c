//! Per-request filter state.

use lanyard_types::AttributeMap;

use crate::metadata::{PartyDescriptor, PartyMetadataLookup};

/// Which party of the request a matcher inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Party {
    /// The relying party asking for attributes.
    Requester,
    /// The party releasing them.
    Issuer,
}

impl std::fmt::Display for Party {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Party::Requester => f.write_str("requester"),
            Party::Issuer => f.write_str("issuer"),
        }
    }
}

/// Attributes to filter plus the request they are released in.
#[derive(Debug, Clone, Default)]
pub struct FilterContext {
    principal: Option<String>,
    requester: Option<String>,
    issuer: Option<String>,
    requester_metadata: Option<PartyDescriptor>,
    issuer_metadata: Option<PartyDescriptor>,
    unfiltered: AttributeMap,
    filtered: AttributeMap,
}

impl FilterContext {
    pub fn new(attributes: AttributeMap) -> Self {
        Self {
            unfiltered: attributes,
            ..Self::default()
        }
    }

    pub fn with_principal(mut self, principal: impl Into<String>) -> Self {
        self.principal = Some(principal.into());
        self
    }

    pub fn with_requester(mut self, requester: impl Into<String>) -> Self {
        self.requester = Some(requester.into());
        self
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn with_requester_metadata(mut self, descriptor: PartyDescriptor) -> Self {
        self.requester_metadata = Some(descriptor);
        self
    }

    pub fn with_issuer_metadata(mut self, descriptor: PartyDescriptor) -> Self {
        self.issuer_metadata = Some(descriptor);
        self
    }

    /// Fills requester and issuer metadata from `lookup`.
    ///
    /// Unknown parties are left without metadata.
    pub fn with_metadata_lookup(mut self, lookup: &dyn PartyMetadataLookup) -> Self {
        if let Some(requester) = self.requester.as_deref() {
            self.requester_metadata = lookup.lookup(requester);
        }
        if let Some(issuer) = self.issuer.as_deref() {
            self.issuer_metadata = lookup.lookup(issuer);
        }
        self
    }

    pub fn principal(&self) -> Option<&str> {
        self.principal.as_deref()
    }

    pub fn requester(&self) -> Option<&str> {
        self.requester.as_deref()
    }

    pub fn issuer(&self) -> Option<&str> {
        self.issuer.as_deref()
    }

    pub fn party(&self, party: Party) -> Option<&str> {
        match party {
            Party::Requester => self.requester(),
            Party::Issuer => self.issuer(),
        }
    }

    pub fn metadata(&self, party: Party) -> Option<&PartyDescriptor> {
        match party {
            Party::Requester => self.requester_metadata.as_ref(),
            Party::Issuer => self.issuer_metadata.as_ref(),
        }
    }

    pub fn unfiltered_attributes(&self) -> &AttributeMap {
        &self.unfiltered
    }

    /// Attributes left after the last [`AttributeFilter::filter`](crate::AttributeFilter::filter) call.
    pub fn filtered_attributes(&self) -> &AttributeMap {
        &self.filtered
    }

    pub fn take_filtered_attributes(&mut self) -> AttributeMap {
        std::mem::take(&mut self.filtered)
    }

    pub(crate) fn set_filtered_attributes(&mut self, filtered: AttributeMap) {
        self.filtered = filtered;
    }
}
