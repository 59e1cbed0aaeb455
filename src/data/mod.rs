/// Data layer: core types, container loading, and channel selection.
///
/// Architecture:
/// ```text
///  .obf files
///        │
///        ▼
///   ┌──────────┐
///   │   obf     │  parse OMAS_BF stack chain
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  discover files, stacks → Vec<Scene>
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  channel config → Vec<ChannelImage>
///   └──────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod model;
pub mod obf;
