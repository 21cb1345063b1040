use crate::db::open_data_dir;
use crate::error::Result;
use crate::settings::{load_settings, save_settings, shellexpand_path};

pub fn run(data_dir: Option<String>) -> Result<()> {
    let mut settings = load_settings();
    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    }

    save_settings(&settings)?;

    let resolved = settings.data_path();
    std::fs::create_dir_all(&resolved)?;
    std::fs::create_dir_all(settings.imports_dir())?;

    open_data_dir(&resolved)?;
    log::info!("database ready in {}", resolved.display());

    println!("Initialized inventario at {}", resolved.display());
    Ok(())
}
