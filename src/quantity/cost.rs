quantity!(Cost, "€", 2);

impl Cost {
    pub const UNIT: &'static str = "€";
}
