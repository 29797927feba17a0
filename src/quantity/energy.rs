quantity!(KilowattHours, "kWh", 3);

impl KilowattHours {
    pub const UNIT: &'static str = "kWh";
}
