//! PCBA fixtures: power board and the RF motherboard/assembly pair
//!
//! The RF motherboard fixture feeds the serial of every board it tests into
//! the `pcba-rf` pool; the RF assembly fixture takes one board from that pool
//! per unit.

use super::{Fixture, SubUnitSource};
use crate::executor::RetryPolicy;
use crate::identity::UnitTemplate;
use crate::measurement::{Simulation, SimulationPlan};
use crate::models::{AbortPolicy, Limits, Sequence, SequenceError, StepDefinition};

pub const RF_POOL: &str = "pcba-rf";

pub fn power() -> Result<Fixture, SequenceError> {
    let sequence = Sequence::builder("pcba-power")
        .step(StepDefinition::string("pcba_firmware_version", "1.4.3", 1))
        .step(StepDefinition::boolean("check_button", 1))
        .step(StepDefinition::boolean("check_led_switch_on", 1))
        .step(StepDefinition::numeric("test_voltage_input", "V", Limits::range(20.0, 60.0), 3))
        .step(StepDefinition::numeric("test_voltage_output", "V", Limits::range(220.0, 240.0), 3))
        .step(StepDefinition::numeric("test_overcurrent_protection", "A", Limits::at_most(25.0), 3))
        .step(StepDefinition::boolean("test_battery_switch", 2))
        .step(StepDefinition::numeric("test_converter_efficiency", "%", Limits::range(85.0, 98.0), 5))
        .step(StepDefinition::boolean("test_power_saving_mode", 2))
        .step(StepDefinition::boolean("visual_control_pcb_coating", 5))
        .policy(AbortPolicy::RunAll)
        .build()?;

    let plan = SimulationPlan::new()
        .step("pcba_firmware_version", Simulation::text(1.0, "1.4.3", "Unknown"))
        .step("check_button", Simulation::flag(1.0))
        .step("check_led_switch_on", Simulation::flag(0.98))
        .step("test_voltage_input", Simulation::number(0.99, (40.0, 60.0), (10.0, 19.0), 0))
        .step("test_voltage_output", Simulation::number(0.99, (220.0, 240.0), (190.0, 200.0), 0))
        .step("test_overcurrent_protection", Simulation::number(0.8, (20.0, 24.0), (26.0, 32.0), 1))
        .step("test_battery_switch", Simulation::flag(0.98))
        .step("test_converter_efficiency", Simulation::number(0.99, (90.0, 96.0), (80.0, 84.9), 1))
        .step("test_power_saving_mode", Simulation::flag(1.0))
        .step("visual_control_pcb_coating", Simulation::flag(1.0));

    Ok(Fixture::new(
        "pcba-power",
        "Power converter PCBA: firmware, voltages, protection, efficiency",
        "FVT197",
        UnitTemplate::new("00220", "A"),
        sequence,
        plan,
    ))
}

pub fn rf_motherboard() -> Result<Fixture, SequenceError> {
    let sequence = Sequence::builder("pcba-rf-motherboard")
        .step(StepDefinition::boolean("power_supply_test", 10))
        .step(StepDefinition::numeric("frequency_range_test", "MHz", Limits::range(100.0, 18000.0), 20))
        .step(StepDefinition::numeric("bandwidth_test", "MHz", Limits::range(100.0, 18000.0), 15))
        .step(StepDefinition::numeric("input_signal_power_test", "dBm", Limits::at_most(20.0), 20))
        .step(StepDefinition::numeric("output_signal_power_test", "dBm", Limits::range(7.0, 15.0), 15))
        .step(StepDefinition::string("adc_dac_resolution_check", "14 bits", 5))
        .step(StepDefinition::boolean("ddr4_memory_check", 30))
        .policy(AbortPolicy::AbortOnFirstFailure)
        .build()?;

    let plan = SimulationPlan::new()
        .step("power_supply_test", Simulation::flag(1.0))
        .step("frequency_range_test", Simulation::number(0.99, (100.0, 18000.0), (50.0, 99.0), 2))
        .step("bandwidth_test", Simulation::number(0.85, (100.0, 18000.0), (50.0, 99.0), 2))
        .step("input_signal_power_test", Simulation::number(0.99, (8.0, 12.0), (20.5, 25.0), 2))
        .step("output_signal_power_test", Simulation::number(0.99, (8.0, 12.0), (0.0, 6.9), 2))
        .step("adc_dac_resolution_check", Simulation::text(1.0, "14 bits", "Incorrect Resolution"))
        .step("ddr4_memory_check", Simulation::flag(1.0));

    Ok(Fixture::new(
        "pcba-rf-motherboard",
        "RF motherboard PCBA; feeds tested boards into the pcba-rf pool",
        "FVT1",
        UnitTemplate::new("00375", "A").batch("1024"),
        sequence,
        plan,
    )
    .produces(RF_POOL)
    .retry(RetryPolicy::new(5)))
}

pub fn rf_assembly() -> Result<Fixture, SequenceError> {
    let sequence = Sequence::builder("pcba-rf-assembly")
        .step(StepDefinition::boolean("visual_inspection", 5))
        .step(StepDefinition::boolean("backplane_interface_validation", 5))
        .step(StepDefinition::string("pcba_firmware_version", "1.4.3", 2))
        .step(StepDefinition::numeric("check_power_supply_12V", "V", Limits::range(11.5, 12.5), 3))
        .step(StepDefinition::numeric("check_power_supply_3V3", "V", Limits::range(3.0, 3.6), 3))
        .step(StepDefinition::numeric("check_power_consumption", "W", Limits::at_most(80.0), 5))
        .step(StepDefinition::numeric("check_thermal_sensor", "°C", Limits::range(35.0, 55.0), 5))
        .step(StepDefinition::boolean("read_eeprom", 2))
        .step(StepDefinition::boolean("write_eeprom", 2))
        .step(StepDefinition::boolean("read_and_write_eMMC", 4))
        .step(StepDefinition::boolean("check_JTAG_connector", 2))
        .step(StepDefinition::numeric("check_gain_bandwidth_at_15GHz", "dBm", Limits::range(-7.2, -6.8), 6))
        .step(StepDefinition::numeric("check_gain_bandwidth_at_15p5GHz", "dBm", Limits::range(-7.2, -6.8), 6))
        .step(StepDefinition::numeric("check_gain_bandwidth_at_16GHz", "dBm", Limits::range(-7.2, -6.8), 6))
        .policy(AbortPolicy::AbortOnFirstFailure)
        .build()?;

    let gain = || Simulation::number(0.99, (-7.2, -6.8), (-7.8, -7.3), 1);
    let plan = SimulationPlan::new()
        .step("visual_inspection", Simulation::flag(0.98))
        .step("backplane_interface_validation", Simulation::flag(0.95))
        .step("pcba_firmware_version", Simulation::text(1.0, "1.4.3", "Unknown"))
        .step("check_power_supply_12V", Simulation::number(0.95, (12.0, 12.5), (10.5, 11.4), 1))
        .step("check_power_supply_3V3", Simulation::number(0.9, (3.3, 3.6), (1.1, 2.9), 2))
        .step("check_power_consumption", Simulation::number(0.99, (75.0, 80.0), (81.0, 85.0), 1))
        .step("check_thermal_sensor", Simulation::number(0.8, (35.0, 55.0), (56.0, 85.0), 1))
        .step("read_eeprom", Simulation::flag(0.98))
        .step("write_eeprom", Simulation::flag(0.97))
        .step("read_and_write_eMMC", Simulation::flag(0.96))
        .step("check_JTAG_connector", Simulation::flag(0.99))
        .step("check_gain_bandwidth_at_15GHz", Simulation::number(0.98, (-7.2, -6.8), (-7.8, -7.3), 1))
        .step("check_gain_bandwidth_at_15p5GHz", gain())
        .step("check_gain_bandwidth_at_16GHz", gain());

    Ok(Fixture::new(
        "pcba-rf-assembly",
        "RF assembly built on a motherboard taken from the pcba-rf pool",
        "FVT3",
        UnitTemplate::new("00389", "A"),
        sequence,
        plan,
    )
    .sub_units(SubUnitSource::Pool {
        name: RF_POOL.to_string(),
        count: 1,
    }))
}
