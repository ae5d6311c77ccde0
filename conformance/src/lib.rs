//! Bindings generated at build time from the grammars in `grammars/`.

pub mod book {
    include!(concat!(env!("OUT_DIR"), "/book.rs"));
}

pub mod outline {
    include!(concat!(env!("OUT_DIR"), "/outline.rs"));
}

pub mod catalog {
    include!(concat!(env!("OUT_DIR"), "/catalog.rs"));
}

pub mod playlist {
    include!(concat!(env!("OUT_DIR"), "/playlist.rs"));
}
