//! Property tests for the encoder open sequence.

use netbox_core::{AxisIndex, AxisSelection};
use netbox_hardware::mock::{EncoderCall, MockEncoder};
use netbox_hardware::types::OperatingMode;
use netbox_hardware::{EncoderConfig, EncoderSession, HardwareError, SessionState, VendorCode};
use proptest::prelude::*;

fn axis_subset() -> impl Strategy<Value = AxisSelection> {
    proptest::sample::subsequence(AxisIndex::ALL.to_vec(), 1..=4)
        .prop_map(|axes| AxisSelection::new(axes).unwrap())
}

/// Calls that can be made to fail, with the step they belong to.
fn failing_call() -> impl Strategy<Value = (EncoderCall, usize)> {
    prop_oneof![
        Just((EncoderCall::GetHostIp(String::new()), 1)),
        Just((EncoderCall::Open { timeout_ms: 0 }, 2)),
        Just((EncoderCall::GetAxis, 3)),
        Just((EncoderCall::InitAxis(0), 4)),
        Just((EncoderCall::GetTimestampTicks, 5)),
        Just((EncoderCall::SetTimestampPeriod(0), 6)),
        Just((EncoderCall::SetTimestamp { axis: 0, enable: true }, 7)),
        Just((EncoderCall::AddDataPacketSection { region: 0, items: 0 }, 8)),
        Just((EncoderCall::ConfigDataPacket { sections: 0 }, 13)),
        Just((EncoderCall::GetTimerTriggerTicks, 14)),
        Just((EncoderCall::SetTimerTriggerPeriod(0), 15)),
        Just((EncoderCall::AxisTriggerSource { axis: 0, source: 0 }, 16)),
        Just((EncoderCall::MasterTriggerSource(0), 17)),
        Just((EncoderCall::SelectMode(OperatingMode::Streaming), 18)),
        Just((EncoderCall::GlobalTriggerEnable { enable: true, mask: 0 }, 19)),
    ]
}

proptest! {
    #[test]
    fn open_initializes_exactly_the_selected_axes(axes in axis_subset()) {
        let (driver, _handle) = MockEncoder::new();
        let mut session = EncoderSession::new(driver, EncoderConfig::default());

        session.open(&axes).unwrap();
        prop_assert_eq!(session.state(), SessionState::Ready);
        for axis in AxisIndex::ALL {
            prop_assert_eq!(session.axes().get(axis).is_some(), axes.contains(axis));
        }
    }

    #[test]
    fn failed_open_names_first_failing_step(
        axes in axis_subset(),
        (call, step) in failing_call(),
        code in -1000i32..-1,
    ) {
        let (driver, handle) = MockEncoder::new();
        handle.fail_on(call, VendorCode(code));
        let mut session = EncoderSession::new(driver, EncoderConfig::default());

        let err = session.open(&axes).unwrap_err();
        let is_protocol = matches!(err, HardwareError::DeviceProtocol { .. });
        prop_assert!(is_protocol);
        prop_assert_eq!(err.step_index(), Some(step));
        prop_assert_eq!(err.vendor_code(), Some(VendorCode(code)));
        prop_assert_eq!(session.state(), SessionState::Disconnected);
        prop_assert!(!handle.is_open());
        prop_assert!(session.axes().is_empty());
    }

    #[test]
    fn unreported_axis_fails_axis_init_step(reported in 0usize..4) {
        let (driver, handle) = MockEncoder::new();
        handle.set_axis_count(reported);
        let mut session = EncoderSession::new(driver, EncoderConfig::default());

        let err = session.open(&AxisSelection::all()).unwrap_err();
        let is_protocol = matches!(err, HardwareError::DeviceProtocol { .. });
        prop_assert!(is_protocol);
        prop_assert_eq!(err.step_index(), Some(4));
        prop_assert_eq!(err.vendor_code(), Some(VendorCode::UNSUCCESSFUL));
        prop_assert_eq!(session.state(), SessionState::Disconnected);
        prop_assert!(!handle.is_open());
    }
}
