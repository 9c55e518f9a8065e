pub mod aggregate;
pub mod filter;
pub mod normalize;
pub mod view;

pub use aggregate::{aggregate, check_summary, risk_score, DomainAggregate, FindingsAggregate, SummaryDrift};
pub use filter::{domain_options, filter_findings, FindingFilter, Selection};
pub use normalize::{merge_streams, rank_of, risk_weight};
pub use view::FindingsView;
