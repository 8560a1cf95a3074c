pub mod combine;
pub mod consts;
pub mod error;
pub mod frame;
pub mod io;
pub mod master;
pub mod pipeline;
pub mod reject;
pub mod scale;
pub mod stats;
