mod record;
mod gallery;

pub use record::{
    MediaRecord,
    NewLink,
    ResourceKind,
    StoredLink,
    UploadedMedia,
    parse_timestamp,
};
pub use gallery::{
    FilterKind,
    GalleryStats,
    GalleryView,
    ViewMode,
    filter_records,
};
