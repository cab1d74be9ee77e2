use std::path::Path;

use clap::builder::styling::AnsiColor;
use log::{debug, error, warn};
use tokio::fs;

use crate::{
    error::{Error, LocalState, Result},
    format::format_path,
    paths::{remove_dir_if_exists, try_exists, DataRoot, DATA_DIRS},
};

/// Replaces the live data directories with the ones in `staging`.
///
/// Live directories are first moved into `shadow`. If moving the staged
/// directories in fails, the shadow copies are moved back. Errors are always
/// [`Error::RestoreFailed`], carrying what happened to the live data.
pub async fn swap_in(root: &DataRoot, staging: &Path, shadow: &Path) -> Result<()> {
    remove_dir_if_exists(shadow)
        .await
        .map_err(|err| Error::restore_failed(LocalState::Intact, err))?;
    fs::create_dir_all(shadow)
        .await
        .map_err(|err| Error::restore_failed(LocalState::Intact, err.into()))?;

    let mut moved = vec![];
    for dir in DATA_DIRS {
        let live = root.path().join(dir);
        let exists = try_exists(&live).await;
        let result = match exists {
            Ok(true) => fs::rename(&live, shadow.join(dir)).await.map_err(Error::from),
            Ok(false) => continue,
            Err(err) => Err(err),
        };

        if let Err(err) = result {
            let state = if moved.is_empty() {
                LocalState::Intact
            } else {
                roll_back(root, shadow, &moved).await
            };
            return Err(Error::restore_failed(state, err));
        }

        moved.push(dir);
    }

    for dir in DATA_DIRS {
        if let Err(err) = fs::rename(staging.join(dir), root.path().join(dir)).await {
            let state = roll_back(root, shadow, &moved).await;
            return Err(Error::restore_failed(state, err.into()));
        }
    }

    if let Err(err) = remove_dir_if_exists(shadow).await {
        warn!("couldn't remove {} ({err})", format_path(shadow));
    }

    let style = AnsiColor::Green.on_default();
    debug!("{style}swapped in{style:#} {}", format_path(staging));
    Ok(())
}

/// Puts the shadow copies of `moved` back in place, discarding whatever was
/// moved in since.
async fn roll_back(root: &DataRoot, shadow: &Path, moved: &[&str]) -> LocalState {
    let mut state = LocalState::RolledBack;
    for dir in DATA_DIRS {
        let live = root.path().join(dir);
        if let Err(err) = remove_dir_if_exists(&live).await {
            error!("couldn't clear {} ({err})", format_path(&live));
            state = LocalState::Cleared;
            continue;
        }

        if moved.contains(&dir) {
            if let Err(err) = fs::rename(shadow.join(dir), &live).await {
                error!("couldn't move back {} ({err})", format_path(&live));
                state = LocalState::Cleared;
            }
        }
    }

    if state == LocalState::RolledBack {
        let style = AnsiColor::Yellow.on_default();
        debug!("{style}rolled back{style:#} {}", format_path(root.path()));
    }

    state
}
