//! # lanyard-filter: Attribute release filtering
//!
//! Decides, per requesting party, which resolved attributes and values may
//! be released. Rules evaluate in three-valued logic so that "could not
//! decide" ([`Tristate::Fail`]) is never mistaken for an authoritative "no".
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  FilterContext                               │
//! │  (resolved attributes + requester/issuer    │
//! │   + party metadata)                          │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  AttributeFilter                             │
//! │  for each policy:                            │
//! │  ├─ requirement rule  → TRUE / FALSE / FAIL  │
//! │  └─ if TRUE: permit / deny rules per value   │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  Filtered attributes + FilterReport          │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Examples
//!
//! ```
//! use lanyard_filter::{
//!     AttributeFilter, AttributeFilterPolicy, AttributeRule, FilterContext, Matcher, StringMatch,
//! };
//! use lanyard_types::{Attribute, AttributeMap};
//!
//! let filter = AttributeFilter::builder("default")
//!     .with_policy(
//!         AttributeFilterPolicy::new("release-affiliation", Matcher::Any).with_rule(
//!             AttributeRule::new("eduPersonAffiliation")
//!                 .permit(Matcher::value(StringMatch::exact("member"))),
//!         ),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let mut attributes = AttributeMap::new();
//! attributes.insert(
//!     "eduPersonAffiliation".to_string(),
//!     Attribute::new("eduPersonAffiliation").with_values(["member", "staff"]),
//! );
//! let mut ctx = FilterContext::new(attributes).with_requester("https://sp.example.org");
//! filter.filter(&mut ctx);
//!
//! assert_eq!(ctx.filtered_attributes()["eduPersonAffiliation"].len(), 1);
//! ```

mod context;
mod engine;
mod error;
mod matcher;
mod metadata;
mod policy;
mod rule;
mod tristate;


pub use context::{FilterContext, Party};
pub use engine::{
    AttributeFilter, AttributeFilterBuilder, FilterReport, PolicyOutcome, RuleSide, ValueFailure,
};
pub use error::{FilterConfigError, Result};
pub use matcher::{Matcher, StringMatch, TextTest, ValuePattern};
pub use metadata::{EntityGroup, PartyDescriptor, PartyMetadataLookup, StaticMetadata};
pub use policy::AttributeFilterPolicy;
pub use rule::{AttributeRule, MatchRule};
pub use tristate::Tristate;
