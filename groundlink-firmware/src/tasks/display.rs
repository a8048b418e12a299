//! Status display task
//!
//! Redraws the OLED whenever the link task publishes an update.

use defmt::*;

use groundlink_core::traits::StatusDisplay;
use groundlink_drivers::display::Ssd1306;
use groundlink_hal_rp2040::DisplayBus;

use crate::channels::{DisplayUpdate, DISPLAY_UPDATE};

/// Display task - shows the latest statistics or the stop reason
#[embassy_executor::task]
pub async fn display_task(mut oled: Ssd1306<DisplayBus>) {
    info!("Display task started");

    loop {
        let result = match DISPLAY_UPDATE.wait().await {
            DisplayUpdate::Status(stats) => oled.show_stats(&stats),
            DisplayUpdate::LinkDown(kind) => oled.show_error(kind),
        };

        if let Err(e) = result {
            warn!("Display update failed: {:?}", e);
        }
    }
}
