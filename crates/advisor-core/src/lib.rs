#![deny(warnings)]
pub mod belief;
pub mod frontier;
pub mod model;
pub mod policy;
pub mod simulation;
pub mod solver;

pub struct AppInfo;

impl AppInfo {
    pub const fn name() -> &'static str {
        "advisor-gittins"
    }

    pub const fn codename() -> &'static str {
        "Patience Frontier"
    }

    pub const fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}

#[cfg(test)]
mod tests {
    use super::AppInfo;

    #[test]
    fn exposes_static_metadata() {
        assert_eq!(AppInfo::name(), "advisor-gittins");
        assert_eq!(AppInfo::codename(), "Patience Frontier");
        assert!(!AppInfo::version().is_empty());
    }
}
