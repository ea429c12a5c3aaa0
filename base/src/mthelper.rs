//! Multithread Support Helper

use cfg_if::cfg_if;

cfg_if! {
    if #[cfg(feature = "mt")] {
        // device objects may cross into other threads
        pub use std::sync::Arc as SharedRef;
    } else {
        pub use std::rc::Rc as SharedRef;
    }
}
