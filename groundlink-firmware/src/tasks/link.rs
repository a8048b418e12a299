//! Rover link task
//!
//! Runs the supervisor one cycle at a time. Each cycle blocks the executor
//! for up to `GroundConfig::max_cycle_ms` while the radio listens and sends;
//! the task yields between cycles so the display can catch up.

use defmt::*;
use embassy_time::Delay;
use portable_atomic::Ordering;

use groundlink_core::{CycleReport, Exchange, LinkError, Supervisor};
use groundlink_drivers::radio::Rfm69;
use groundlink_hal_rp2040::{OutputLine, RadioSpi, RtcClock};
use groundlink_protocol::tag_name;

use crate::channels::{DisplayUpdate, DISPLAY_UPDATE, EXCHANGES, LINK_UP};

/// Transceiver on the Feather's SPI1
pub type Radio = Rfm69<RadioSpi, OutputLine, OutputLine, Delay>;

/// Supervised link with the board's radio and RTC
pub type LinkSupervisor = Supervisor<Radio, RtcClock, Delay>;

/// Link task - receives telemetry and acknowledges it until the policy stops
#[embassy_executor::task]
pub async fn link_task(mut supervisor: LinkSupervisor) {
    info!("Link task started, listening for rover");
    LINK_UP.store(true, Ordering::Relaxed);

    let error = loop {
        match supervisor.run_cycle() {
            Ok(report) => {
                log_report(&report);
                if let CycleReport::Acknowledged(_) = report {
                    EXCHANGES.fetch_add(1, Ordering::Relaxed);
                }
                DISPLAY_UPDATE.signal(DisplayUpdate::Status(*supervisor.stats()));
            }
            Err(e) => break e,
        }
        embassy_futures::yield_now().await;
    };

    LINK_UP.store(false, Ordering::Relaxed);
    log_link_down(&error);
    DISPLAY_UPDATE.signal(DisplayUpdate::LinkDown(error.kind()));
}

fn log_report(report: &CycleReport) {
    match report {
        CycleReport::Acknowledged(exchange) => log_exchange(exchange),
        CycleReport::Dropped(LinkError::Unexpected { tag }) => {
            warn!("Dropped {} frame (tag {})", tag_name(*tag), tag);
        }
        CycleReport::Dropped(e) => warn!("Dropped frame: {:?}", e),
        CycleReport::Silent {
            consecutive,
            waiting: true,
        } => debug!("Waiting for rover ({} timeouts)", consecutive),
        CycleReport::Silent {
            consecutive,
            waiting: false,
        } => warn!("Rover silent ({} consecutive timeouts)", consecutive),
    }
}

fn log_exchange(exchange: &Exchange) {
    let t = &exchange.telemetry;
    info!(
        "Telemetry {:?}: lat={} lon={} alt={} speed={} sats={} heading={}",
        t.timestamp,
        t.location.latitude,
        t.location.longitude,
        t.location.altitude,
        t.location.speed,
        t.location.satellites,
        t.location.heading
    );
    info!(
        "  rssi={} rover_signal={} free_mem={} status=\"{}\"",
        exchange.rssi,
        t.signal_strength,
        t.free_memory,
        t.status.as_str()
    );

    if exchange.attempts > 1 {
        warn!("Ack sent after {} attempts", exchange.attempts);
    } else {
        debug!("Ack sent");
    }
}

fn log_link_down(error: &LinkError) {
    match error {
        LinkError::Timeout { waited_ms } => {
            error!("Link down: rover silent, last wait {}ms", waited_ms)
        }
        LinkError::Transmit { error, attempts } => {
            error!("Link down: ack failed after {} attempts: {:?}", attempts, error)
        }
        other => error!("Link down: {:?} ({})", other, other.kind().label()),
    }
}
