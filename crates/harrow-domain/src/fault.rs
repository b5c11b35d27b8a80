use crate::sample::TelemetrySample;

/// Active diagnostic trouble code slots a single sample can carry.
/// Mirrors the slot layout the bus decoder uses when it flattens a
/// DM1 frame into signals.
const MAX_DTC_SLOTS: usize = 8;

/// One raw fault sighting extracted from a sample. The (spn, fmi) pair
/// identifies the fault condition; description and category come from
/// the code catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultObservation {
    pub spn: u32,
    pub fmi: u8,
    pub description: String,
    pub category: String,
}

impl FaultObservation {
    pub fn from_codes(spn: u32, fmi: u8) -> Self {
        let (component, category) = component_for(spn);
        let description = match component {
            Some(name) => format!("{}: {}", name, failure_mode_for(fmi)),
            None => format!("SPN {}: {}", spn, failure_mode_for(fmi)),
        };
        Self {
            spn,
            fmi,
            description,
            category: category.to_string(),
        }
    }

    pub fn dedup_key(&self) -> (u32, u8) {
        (self.spn, self.fmi)
    }
}

/// Scans a sample for active DTC signal groups (`ActiveDtc{i}Spn` /
/// `ActiveDtc{i}Fmi`). Slots are filled contiguously from 1, so the
/// scan stops at the first incomplete group.
pub fn extract_observations(sample: &TelemetrySample) -> Vec<FaultObservation> {
    let mut observations = Vec::new();
    for slot in 1..=MAX_DTC_SLOTS {
        let spn = sample.numeric_signal(&format!("ActiveDtc{}Spn", slot));
        let fmi = sample.numeric_signal(&format!("ActiveDtc{}Fmi", slot));
        match (spn, fmi) {
            (Some(spn), Some(fmi)) if spn >= 0.0 && (0.0..=255.0).contains(&fmi) => {
                observations.push(FaultObservation::from_codes(spn as u32, fmi as u8));
            }
            _ => break,
        }
    }
    observations
}

/// Suspect parameter numbers this fleet actually reports, with the
/// subsystem they belong to. Unlisted codes fall through to the
/// unknown bucket rather than being dropped.
fn component_for(spn: u32) -> (Option<&'static str>, &'static str) {
    match spn {
        84 => (Some("Wheel-Based Vehicle Speed"), "drivetrain"),
        91 => (Some("Accelerator Pedal Position"), "drivetrain"),
        94 => (Some("Fuel Delivery Pressure"), "fuel"),
        96 => (Some("Fuel Level"), "fuel"),
        97 => (Some("Water In Fuel Indicator"), "fuel"),
        98 => (Some("Engine Oil Level"), "engine"),
        100 => (Some("Engine Oil Pressure"), "engine"),
        110 => (Some("Engine Coolant Temperature"), "engine"),
        111 => (Some("Engine Coolant Level"), "engine"),
        158 => (Some("Battery Potential, Switched"), "electrical"),
        168 => (Some("Battery Potential"), "electrical"),
        190 => (Some("Engine Speed"), "engine"),
        _ => (None, "unknown"),
    }
}

/// J1939 failure mode identifier text.
fn failure_mode_for(fmi: u8) -> &'static str {
    match fmi {
        0 => "data valid but above normal (most severe)",
        1 => "data valid but below normal (most severe)",
        2 => "data erratic, intermittent or incorrect",
        3 => "voltage above normal or shorted high",
        4 => "voltage below normal or shorted low",
        5 => "current below normal or open circuit",
        6 => "current above normal or grounded circuit",
        7 => "mechanical system not responding",
        8 => "abnormal frequency, pulse width or period",
        9 => "abnormal update rate",
        10 => "abnormal rate of change",
        11 => "root cause not known",
        12 => "bad intelligent device or component",
        13 => "out of calibration",
        14 => "special instructions",
        15 => "data valid but above normal (least severe)",
        16 => "data valid but above normal (moderately severe)",
        17 => "data valid but below normal (least severe)",
        18 => "data valid but below normal (moderately severe)",
        19 => "received network data in error",
        31 => "condition exists",
        _ => "failure mode not defined",
    }
}
