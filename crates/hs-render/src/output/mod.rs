#[cfg(feature = "pdf")]
pub mod pdf;
#[cfg(feature = "png")]
pub mod png;

#[cfg(any(feature = "png", feature = "pdf"))]
mod fonts {
    use std::sync::{Arc, OnceLock};

    use usvg::fontdb::Database;

    static SYSTEM_FONTS: OnceLock<Arc<Database>> = OnceLock::new();

    /// System fonts, loaded once per process.
    pub(crate) fn database() -> Arc<Database> {
        SYSTEM_FONTS
            .get_or_init(|| {
                let mut db = Database::new();
                db.load_system_fonts();
                if db.is_empty() {
                    tracing::warn!("no system fonts found; text will be missing from PNG/PDF output");
                } else {
                    tracing::debug!(faces = db.len(), "loaded system fonts");
                }
                Arc::new(db)
            })
            .clone()
    }

    pub(crate) fn options() -> usvg::Options<'static> {
        let mut opt = usvg::Options::default();
        opt.fontdb = database();
        opt
    }
}
