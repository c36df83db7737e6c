use assetmerge_core::{AssetId, AssetStore, DependentKind, Result};
use tracing::trace;

/// Move every dependent row of `source` onto `target`. Returns the number of
/// rows touched; afterwards nothing references `source`.
pub fn relink<S: AssetStore>(store: &S, source: AssetId, target: AssetId) -> Result<usize> {
    if source == target {
        return Ok(0);
    }

    let mut touched = 0;
    for kind in DependentKind::ALL {
        let rows = store.relink_dependents(source, target, kind)?;
        if rows > 0 {
            trace!(%kind, source, target, rows, "relinked dependents");
        }
        touched += rows;
    }
    Ok(touched)
}
