use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use harrow_domain::{SampleSource, TelemetrySample};

/// Simulated tractor for bench runs: no CAN hardware required. Signal
/// values follow simple physics (targets with inertia plus jitter) so
/// charts look plausible, and transient low-oil-pressure events inject
/// DM1 codes to exercise the fault lifecycle end to end.
pub struct DemoSampleSource {
    engine_rpm: f64,
    speed: f64,
    fuel_level: f64,
    coolant_temp: f64,
    latitude: f64,
    longitude: f64,
    heading: f64,
    altitude: f64,
    ambient_temp: f64,
    oil_pressure: f64,
    time_step: u64,
    fault_ticks: u32,
    rng: StdRng,
}

impl DemoSampleSource {
    pub fn new() -> Self {
        Self {
            engine_rpm: 1200.0,
            speed: 0.0,
            fuel_level: 85.0,
            coolant_temp: 75.0,
            latitude: 40.7128,
            longitude: -74.0060,
            heading: 0.0,
            altitude: 50.0,
            ambient_temp: 22.0,
            oil_pressure: 350.0,
            time_step: 0,
            fault_ticks: 0,
            rng: StdRng::from_entropy(),
        }
    }

    fn advance(&mut self) {
        self.time_step += 1;
        let t = self.time_step as f64;

        let rpm_target = 1500.0 + 300.0 * (t * 0.1).sin();
        self.engine_rpm += (rpm_target - self.engine_rpm) * 0.1 + self.rng.gen_range(-50.0..50.0);
        self.engine_rpm = self.engine_rpm.clamp(800.0, 2500.0);

        let speed_target = 15.0 + 10.0 * (t * 0.05).sin();
        self.speed += (speed_target - self.speed) * 0.1 + self.rng.gen_range(-1.0..1.0);
        self.speed = self.speed.clamp(0.0, 30.0);

        self.fuel_level = (self.fuel_level - self.rng.gen_range(0.01..0.05)).max(0.0);

        let temp_target = 85.0 + self.rng.gen_range(-2.0..2.0);
        self.coolant_temp += (temp_target - self.coolant_temp) * 0.05;

        self.latitude += self.rng.gen_range(-0.0001..0.0001);
        self.longitude += self.rng.gen_range(-0.0001..0.0001);
        self.heading = (self.heading + self.rng.gen_range(-5.0..5.0)).rem_euclid(360.0);
        self.altitude += self.rng.gen_range(-0.5..0.5);
        self.ambient_temp += self.rng.gen_range(-0.1..0.1);

        // Occasional pressure-loss events; while one is running the oil
        // pressure sits well below the alarm threshold.
        if self.fault_ticks > 0 {
            self.fault_ticks -= 1;
            self.oil_pressure = 180.0 + self.rng.gen_range(-15.0..15.0);
        } else {
            self.oil_pressure = 350.0 + self.rng.gen_range(-20.0..20.0);
            if self.rng.gen_bool(0.01) {
                self.fault_ticks = self.rng.gen_range(3..8);
            }
        }
    }
}

impl Default for DemoSampleSource {
    fn default() -> Self {
        Self::new()
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

impl SampleSource for DemoSampleSource {
    fn next_sample(&mut self) -> Option<TelemetrySample> {
        self.advance();

        let torque = 40.0 + (self.speed / 30.0) * 40.0 + self.rng.gen_range(-5.0..5.0);

        let mut sample = TelemetrySample::new(Utc::now());
        let signals = &mut sample.signals;
        signals.insert("EngineSpeed".into(), round1(self.engine_rpm).into());
        signals.insert("EngineCoolantTemp".into(), round1(self.coolant_temp).into());
        signals.insert("FuelLevel".into(), round1(self.fuel_level).into());
        signals.insert(
            "WheelBasedVehicleSpeed".into(),
            round1(self.speed).into(),
        );
        signals.insert("Latitude".into(), self.latitude.into());
        signals.insert("Longitude".into(), self.longitude.into());
        signals.insert("Heading".into(), round1(self.heading).into());
        signals.insert("GPSSpeed".into(), round1(self.speed).into());
        signals.insert("Altitude".into(), round1(self.altitude).into());
        signals.insert("AmbientAirTemp".into(), round1(self.ambient_temp).into());
        signals.insert("EngineOilPressure".into(), self.oil_pressure.round().into());
        signals.insert("EnginePercentTorque".into(), round1(torque).into());

        let mut slot = 1;
        if self.oil_pressure < 250.0 {
            signals.insert(format!("ActiveDtc{}Spn", slot), 100.0.into());
            signals.insert(format!("ActiveDtc{}Fmi", slot), 1.0.into());
            slot += 1;
        }
        if self.coolant_temp > 105.0 {
            signals.insert(format!("ActiveDtc{}Spn", slot), 110.0.into());
            signals.insert(format!("ActiveDtc{}Fmi", slot), 0.0.into());
            slot += 1;
        }
        if self.fuel_level < 10.0 {
            signals.insert(format!("ActiveDtc{}Spn", slot), 96.0.into());
            signals.insert(format!("ActiveDtc{}Fmi", slot), 17.0.into());
        }

        Some(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_core_signals() {
        let mut source = DemoSampleSource::new();

        let sample = source.next_sample().unwrap();

        for name in [
            "EngineSpeed",
            "EngineCoolantTemp",
            "FuelLevel",
            "Latitude",
            "Longitude",
            "EngineOilPressure",
        ] {
            assert!(
                sample.numeric_signal(name).is_some(),
                "missing signal {}",
                name
            );
        }
        let rpm = sample.numeric_signal("EngineSpeed").unwrap();
        assert!((800.0..=2500.0).contains(&rpm));
    }

    #[test]
    fn pressure_loss_event_injects_a_dtc() {
        let mut source = DemoSampleSource::new();
        source.fault_ticks = 5;

        let sample = source.next_sample().unwrap();

        assert_eq!(sample.numeric_signal("ActiveDtc1Spn"), Some(100.0));
        assert_eq!(sample.numeric_signal("ActiveDtc1Fmi"), Some(1.0));
    }
}
