pub mod exclusions;
pub mod extractor;
pub mod filters;
pub mod model;

pub use exclusions::{ExclusionSet, append_exclusions};
pub use extractor::{ExtractError, MarkupLinkExtractor};
pub use filters::{
    ClientSideSeparator, DuplicateFilter, ExclusionFilter, FilterCounts, LinkFilter,
    LinkFilterChain, VideoSeparator,
};
pub use model::{LinkKind, LinkRecord, ResolvedDate, UNKNOWN_DATE};
