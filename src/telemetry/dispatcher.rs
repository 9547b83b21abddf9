//! # Packet Dispatcher
//!
//! Routes complete native frames to their owning handlers: status, sync
//! and channel frames are handled locally, third-party telemetry payloads
//! are forwarded to the external interpreters. Each type enforces a
//! minimum payload length before acting; an undersized frame is dropped
//! with a diagnostic and simply superseded by the next one.

use tracing::{debug, trace, warn};

use super::decoder::TelemetryReceiver;
use super::handlers::ExternalHandlers;
use super::protocol::PacketType;
use super::status::BindStatus;

/// Outbound S.Port telemetry buffered until the module polls the matching
/// physical id.
#[derive(Debug, Clone)]
pub struct SportOutput {
    pub physical_id: u8,
    pub data: Vec<u8>,
}

impl TelemetryReceiver {
    /// Buffer an outbound S.Port frame to be sent on the next matching
    /// poll. Replaces any frame still waiting.
    pub fn queue_sport_output(&mut self, physical_id: u8, data: Vec<u8>) {
        self.pending_sport = Some(SportOutput { physical_id, data });
    }

    /// Route one complete native frame `[type, len, payload...]`.
    pub(crate) fn dispatch_frame(
        &mut self,
        module: usize,
        packet: &[u8],
        handlers: &mut dyn ExternalHandlers,
    ) {
        let type_byte = packet[0];
        let len = packet[1] as usize;
        let data = &packet[2..];

        let Some(packet_type) = PacketType::from_byte(type_byte) else {
            trace!(
                module,
                packet_type = format_args!("{type_byte:02X}"),
                len,
                "unknown packet type"
            );
            return;
        };

        match packet_type {
            PacketType::Status => {
                if len >= 5 {
                    self.handle_status_packet(module, data);
                } else {
                    trace!(module, len, "status packet too short");
                }
            }

            PacketType::DsmBind => {
                if len >= 10 {
                    handlers.dsm_bind_packet(module, data);
                } else {
                    trace!(module, len, "DSM bind packet too short");
                }
            }

            PacketType::SpektrumTelemetry => {
                // The interpreter expects a leading header byte it never
                // checks; hand it our length byte in that position
                if len >= 17 {
                    handlers.spektrum_packet(&packet[1..]);
                } else {
                    trace!(module, len, "spektrum telemetry too short");
                }
            }

            PacketType::FlyskyIbus => {
                if len >= 28 {
                    handlers.flysky_packet(data);
                } else {
                    trace!(module, len, "iBus telemetry too short");
                }
            }

            PacketType::FlyskyIbusAc => {
                if len >= 28 {
                    handlers.flysky_packet_ac(data);
                } else {
                    trace!(module, len, "iBus AC telemetry too short");
                }
            }

            PacketType::HitecTelemetry => {
                if len >= 8 {
                    handlers.hitec_packet(data);
                } else {
                    trace!(module, len, "hitec telemetry too short");
                }
            }

            PacketType::HubTelemetry => {
                if len >= 4 {
                    handlers.frsky_hub_packet(data);
                } else {
                    trace!(module, len, "frsky hub telemetry too short");
                }
            }

            PacketType::SportTelemetry => {
                if len >= 4 {
                    handlers.sport_packet(data);
                } else {
                    trace!(module, len, "sport telemetry too short");
                }
            }

            PacketType::InputSync => {
                if len >= 6 {
                    self.handle_sync_packet(module, data);
                } else {
                    trace!(module, len, "input sync packet too short");
                }
            }

            PacketType::ConfigCommand => {
                // Just an ack to our command, nothing to do
            }

            PacketType::SportPolling => {
                if len >= 1 {
                    self.handle_sport_poll(data[0], handlers);
                }
            }

            PacketType::RxChannels => {
                if len >= 26 {
                    self.handle_rx_channels(data);
                } else {
                    trace!(module, len, "RX channels packet too short");
                }
            }
        }
    }

    /// Status update: overwrite the stored status wholesale, run the
    /// one-shot failsafe check and detect the binding edge.
    pub(crate) fn handle_status_packet(&mut self, module: usize, data: &[u8]) {
        let failsafe_set = self.parsers[self.slot(module)].settings.failsafe_set;

        let status = self.store.module_status_mut(module);
        let was_binding = status.is_binding();

        status.flags = data[0];
        status.major = data[1];
        status.minor = data[2];
        status.revision = data[3];
        status.patch = data[4];
        status.touch();

        if status.requires_failsafe_check {
            status.requires_failsafe_check = false;
            if status.supports_failsafe() && !failsafe_set {
                warn!(module, "module supports failsafe but none is configured");
            }
        }

        let ended_binding = was_binding && !status.is_binding();
        if ended_binding && self.store.bind_status(module) == BindStatus::Initiated {
            debug!(module, "bind finished");
            self.store.set_bind_status(module, BindStatus::Finished);
        }
    }

    /// Input-sync sample: record interval and target, then feed the
    /// refresh-rate estimator with the big-endian (rate, lag) pair.
    fn handle_sync_packet(&mut self, module: usize, data: &[u8]) {
        let new_rate = u16::from_be_bytes([data[0], data[1]]);
        let new_lag = u16::from_be_bytes([data[2], data[3]]);

        let sync = self.store.sync_status_mut(module);
        sync.touch();
        sync.interval = data[4];
        sync.target = data[5];
        sync.calc_adjusted_refresh_rate(new_rate, new_lag);

        trace!(
            module,
            rate = new_rate,
            lag = new_lag,
            adjusted = sync.adjusted_refresh_rate,
            "input sync sample"
        );
    }

    /// S.Port poll: send the buffered outbound frame when the polled id
    /// matches its destination.
    fn handle_sport_poll(&mut self, polled_id: u8, handlers: &mut dyn ExternalHandlers) {
        match self.pending_sport.take() {
            Some(output) if output.physical_id == polled_id => {
                debug!(id = polled_id, "sending buffered sport frame");
                handlers.send_sport_frame(&output.data);
            }
            other => self.pending_sport = other,
        }
    }

    /// Channel passthrough: only decoded while the trainer input is
    /// configured to use this link.
    fn handle_rx_channels(&mut self, data: &[u8]) {
        if !self.trainer_mode {
            return;
        }
        self.channels.unpack(data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::decoder::ModuleSettings;
    use crate::telemetry::handlers::MockExternalHandlers;
    use crate::telemetry::protocol::RadioProtocol;

    fn receiver(failsafe_set: bool, trainer_mode: bool) -> TelemetryReceiver {
        TelemetryReceiver::new(
            &[ModuleSettings {
                protocol: RadioProtocol::Frsky,
                failsafe_set,
            }],
            trainer_mode,
        )
    }

    fn frame(packet_type: u8, payload: &[u8]) -> Vec<u8> {
        let mut packet = vec![packet_type, payload.len() as u8];
        packet.extend_from_slice(payload);
        packet
    }

    #[test]
    fn test_spektrum_forward_includes_length_byte() {
        let mut rx = receiver(true, false);
        let mut handlers = MockExternalHandlers::new();

        let payload: Vec<u8> = (0..17).collect();
        let packet = frame(4, &payload);
        let expected = packet[1..].to_vec();

        handlers
            .expect_spektrum_packet()
            .withf(move |p| p == expected.as_slice())
            .times(1)
            .return_const(());

        rx.dispatch_frame(0, &packet, &mut handlers);
    }

    #[test]
    fn test_undersized_payloads_are_dropped() {
        let mut rx = receiver(true, true);
        let mut handlers = MockExternalHandlers::new();

        // No forwarding expectations: every frame below its minimum must
        // be dropped silently
        rx.dispatch_frame(0, &frame(4, &[0u8; 16]), &mut handlers); // spektrum < 17
        rx.dispatch_frame(0, &frame(5, &[0u8; 9]), &mut handlers); // bind < 10
        rx.dispatch_frame(0, &frame(6, &[0u8; 27]), &mut handlers); // ibus < 28
        rx.dispatch_frame(0, &frame(12, &[0u8; 27]), &mut handlers); // ibus ac < 28
        rx.dispatch_frame(0, &frame(10, &[0u8; 7]), &mut handlers); // hitec < 8
        rx.dispatch_frame(0, &frame(3, &[0u8; 3]), &mut handlers); // hub < 4
        rx.dispatch_frame(0, &frame(2, &[0u8; 3]), &mut handlers); // sport < 4
        rx.dispatch_frame(0, &frame(1, &[0u8; 4]), &mut handlers); // status < 5
        rx.dispatch_frame(0, &frame(8, &[0u8; 5]), &mut handlers); // sync < 6
        rx.dispatch_frame(0, &frame(13, &[0u8; 25]), &mut handlers); // channels < 26

        assert!(!rx.module_status(0).is_valid());
        assert!(!rx.sync_status(0).is_valid());
    }

    #[test]
    fn test_telemetry_payloads_forwarded_verbatim() {
        let mut rx = receiver(true, false);
        let mut handlers = MockExternalHandlers::new();

        let ibus: Vec<u8> = (0..28).collect();
        let expected = ibus.clone();
        handlers
            .expect_flysky_packet()
            .withf(move |p| p == expected.as_slice())
            .times(1)
            .return_const(());

        let hub = [0x5E, 0x10, 0x22, 0x5E];
        handlers
            .expect_frsky_hub_packet()
            .withf(move |p| p == hub)
            .times(1)
            .return_const(());

        rx.dispatch_frame(0, &frame(6, &ibus), &mut handlers);
        rx.dispatch_frame(0, &frame(3, &hub), &mut handlers);
    }

    #[test]
    fn test_unknown_type_is_ignored() {
        let mut rx = receiver(true, true);
        let mut handlers = MockExternalHandlers::new();

        rx.dispatch_frame(0, &frame(11, &[0u8; 32]), &mut handlers);
        rx.dispatch_frame(0, &frame(0xEE, &[0u8; 8]), &mut handlers);

        assert!(!rx.module_status(0).is_valid());
    }

    #[test]
    fn test_config_command_is_a_noop() {
        let mut rx = receiver(true, true);
        let mut handlers = MockExternalHandlers::new();

        rx.dispatch_frame(0, &frame(7, &[0x01]), &mut handlers);
        assert!(!rx.module_status(0).is_valid());
    }

    #[test]
    fn test_binding_edge_promotes_bind_status() {
        let mut rx = receiver(true, false);
        let mut handlers = MockExternalHandlers::new();

        rx.set_bind_status(0, BindStatus::Initiated);

        // Binding in progress (flag 0x08 set)
        rx.dispatch_frame(0, &frame(1, &[0x08, 1, 0, 0, 0]), &mut handlers);
        assert_eq!(rx.bind_status(0), BindStatus::Initiated);

        // Binding flag drops while a bind was requested
        rx.dispatch_frame(0, &frame(1, &[0x00, 1, 0, 0, 0]), &mut handlers);
        assert_eq!(rx.bind_status(0), BindStatus::Finished);
    }

    #[test]
    fn test_binding_edge_without_request_is_ignored() {
        let mut rx = receiver(true, false);
        let mut handlers = MockExternalHandlers::new();

        rx.dispatch_frame(0, &frame(1, &[0x08, 1, 0, 0, 0]), &mut handlers);
        rx.dispatch_frame(0, &frame(1, &[0x00, 1, 0, 0, 0]), &mut handlers);
        assert_eq!(rx.bind_status(0), BindStatus::Normal);
    }

    #[test]
    fn test_failsafe_check_is_one_shot() {
        let mut rx = receiver(false, false);
        let mut handlers = MockExternalHandlers::new();

        assert!(rx.module_status(0).requires_failsafe_check);
        // Module advertises failsafe support (flag 0x10)
        rx.dispatch_frame(0, &frame(1, &[0x10, 1, 0, 0, 0]), &mut handlers);
        assert!(!rx.module_status(0).requires_failsafe_check);

        // Subsequent status frames never re-arm the check
        rx.dispatch_frame(0, &frame(1, &[0x10, 1, 0, 0, 1]), &mut handlers);
        assert!(!rx.module_status(0).requires_failsafe_check);
    }

    #[test]
    fn test_sync_packet_feeds_estimator() {
        let mut rx = receiver(true, false);
        let mut handlers = MockExternalHandlers::new();

        // rate 7000 (0x1B58), lag 100 (0x0064), interval 7, target 0
        rx.dispatch_frame(
            0,
            &frame(8, &[0x1B, 0x58, 0x00, 0x64, 0x07, 0x00]),
            &mut handlers,
        );

        let sync = rx.sync_status(0);
        assert!(sync.is_valid());
        assert_eq!(sync.refresh_rate, 7000);
        assert_eq!(sync.interval, 7);
        // First sample is a rate change: reset to the target period
        assert_eq!(sync.adjusted_refresh_rate, 14_000_000);
    }

    #[test]
    fn test_sport_poll_sends_only_on_id_match() {
        let mut rx = receiver(true, false);
        let mut handlers = MockExternalHandlers::new();

        rx.queue_sport_output(0x67, vec![0x10, 0x00, 0x11, 0x22]);

        // Mismatched poll leaves the buffer in place
        rx.dispatch_frame(0, &frame(9, &[0x12]), &mut handlers);
        assert!(rx.pending_sport.is_some());

        handlers
            .expect_send_sport_frame()
            .withf(|f| f == [0x10, 0x00, 0x11, 0x22])
            .times(1)
            .return_const(());

        rx.dispatch_frame(0, &frame(9, &[0x67]), &mut handlers);
        assert!(rx.pending_sport.is_none());

        // A second matching poll has nothing left to send
        rx.dispatch_frame(0, &frame(9, &[0x67]), &mut handlers);
    }

    #[test]
    fn test_rx_channels_gated_on_trainer_mode() {
        let mut handlers = MockExternalHandlers::new();

        let mut payload = vec![0u8; 26];
        payload[2] = 0; // start channel
        payload[3] = 2; // count
        payload[4] = 0x00;
        payload[5] = 0x04; // ch0 raw = 1024
        payload[6] = 0x20; // ch1 raw = 1024

        let mut rx = receiver(true, false);
        rx.dispatch_frame(0, &frame(13, &payload), &mut handlers);
        assert!(!rx.channels().is_valid());

        let mut rx = receiver(true, true);
        rx.dispatch_frame(0, &frame(13, &payload), &mut handlers);
        assert!(rx.channels().is_valid());
        assert_eq!(rx.channels().values()[0], 0);
        assert_eq!(rx.channels().values()[1], 0);
    }
}
