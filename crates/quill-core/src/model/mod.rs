//! Request-scoped data model: hits, ranked lists, documents and the response
//! envelope.

pub mod document;
pub mod hit;
pub mod request;

pub use document::{ContextLine, LineDocument, PlayFacet};
pub use hit::{Hit, RankedList, RetrievalSource};
pub use request::{
    Aggregations, DEFAULT_PAGE_SIZE, HitView, SearchMode, SearchRequest, SearchResponse,
};
