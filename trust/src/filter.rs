//! Filters for listing trust relationships.

use canopy_store::TrustRecord;
use canopy_types::{CanopyError, TrustRequestType, TrustState, TrustType};

/// Optional constraints on a listing. Unset fields are unconstrained.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrustFilter {
    pub state: Option<TrustState>,
    pub trust_type: Option<TrustType>,
    pub request_type: Option<TrustRequestType>,
}

impl TrustFilter {
    /// Build a filter from raw query parameters, rejecting unknown values.
    pub fn parse(
        state: Option<&str>,
        trust_type: Option<&str>,
        request_type: Option<&str>,
    ) -> Result<Self, CanopyError> {
        Ok(Self {
            state: state.map(str::parse::<TrustState>).transpose()?,
            trust_type: trust_type.map(str::parse::<TrustType>).transpose()?,
            request_type: request_type.map(str::parse::<TrustRequestType>).transpose()?,
        })
    }

    pub fn with_state(mut self, state: TrustState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_trust_type(mut self, trust_type: TrustType) -> Self {
        self.trust_type = Some(trust_type);
        self
    }

    pub fn with_request_type(mut self, request_type: TrustRequestType) -> Self {
        self.request_type = Some(request_type);
        self
    }

    pub fn matches(&self, row: &TrustRecord) -> bool {
        self.state.map_or(true, |s| row.state == s)
            && self.trust_type.map_or(true, |t| row.trust_type == t)
            && self.request_type.map_or(true, |r| row.request_type == r)
    }
}
