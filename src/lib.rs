pub mod blockmodel;
pub mod cli;
pub mod connectivity;
pub mod draw;
pub mod error;
pub mod generate;
pub mod graph;
pub mod loader;

pub use blockmodel::{FitConfig, FitEvent, Hierarchy, minimize_nested_blockmodel_dl};
pub use connectivity::{ComponentLabels, ComponentMode, ConnectivityReport, analyze, label_components};
pub use draw::{DrawConfig, Layout, draw_hierarchy, hierarchy_to_dot};
pub use error::{FitError, LoadError, RenderError};
pub use generate::{PriceConfig, price_network, write_edge_list};
pub use graph::{Graph, GraphBuilder};
pub use loader::{LoadOptions, MalformedPolicy, load_graph, load_graph_from_reader};
