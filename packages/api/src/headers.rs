//! Response headers carried by every paged listing.
//!
//! Paged responses repeat their cursor tokens in headers so that clients can
//! walk a listing whatever the body format. Formats with a page envelope
//! (JSON v2, XML, GeoJSON) also carry them in the body.

/// Token that produced the page.
pub const PAGE: &str = "page";

/// Token for the following page. Absent on the last page.
pub const NEXT_PAGE: &str = "next-page";

/// Parent count of the whole listing, when it was requested or carried by the cursor.
pub const TOTAL: &str = "total";

pub const PAGE_SIZE: &str = "page-size";
