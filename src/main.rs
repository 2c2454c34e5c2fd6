#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod driver;
mod gesture;
mod model_download;
mod pipeline;
mod toggle;
mod types;
mod ui;

use anyhow::Result;
use gpui::Application;

fn main() -> Result<()> {
    env_logger::init();

    Application::new()
        .with_assets(gpui_component_assets::Assets)
        .run(|app| {
            gpui_component::init(app);

            if let Err(err) = ui::launch_ui(app) {
                log::error!("failed to launch ui: {err:?}");
            }
        });

    Ok(())
}
