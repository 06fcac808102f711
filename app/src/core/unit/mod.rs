mod degree_celsius;
mod irradiance;
mod kwh;
mod switch_state;
mod watt;

pub use degree_celsius::DegreeCelsius;
pub use irradiance::WattPerSquareMeter;
pub use kwh::KiloWattHours;
pub use switch_state::SwitchState;
pub use watt::Watt;

impl std::ops::Mul<f64> for Watt {
    type Output = KiloWattHours;

    //power times hours
    fn mul(self, hours: f64) -> Self::Output {
        KiloWattHours(self.0 * hours / 1000.0)
    }
}
