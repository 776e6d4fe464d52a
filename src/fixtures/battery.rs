//! Smart battery fixtures: cell, PCB and the final assembly

use super::{Fixture, SubUnitSource};
use crate::identity::UnitTemplate;
use crate::measurement::{Simulation, SimulationPlan};
use crate::models::{AbortPolicy, Limits, Sequence, SequenceError, StepDefinition};

pub fn cell() -> Result<Fixture, SequenceError> {
    let sequence = Sequence::builder("battery-cell")
        .step(StepDefinition::numeric("esr", "mΩ", Limits::range(5.0, 15.0), 2))
        .step(StepDefinition::numeric("cell_voltage", "V", Limits::range(3.0, 3.5), 2))
        .step(StepDefinition::numeric("ir", "mΩ", Limits::range(5.0, 15.0), 2))
        .step(StepDefinition::numeric("charge_discharge_cycle", "% Capacity", Limits::range(95.0, 100.0), 30))
        .policy(AbortPolicy::RunAll)
        .build()?;

    let plan = SimulationPlan::new()
        .step("esr", Simulation::Constant(14.33))
        .step("cell_voltage", Simulation::number(0.98, (3.0, 3.5), (2.5, 2.9), 2))
        .step("ir", Simulation::number(0.98, (5.0, 10.0), (15.1, 20.0), 2))
        .step("charge_discharge_cycle", Simulation::number(0.98, (95.0, 100.0), (80.0, 94.0), 1));

    Ok(Fixture::new(
        "battery-cell",
        "Battery cell ESR, voltage, internal resistance and capacity",
        "FVT2",
        UnitTemplate::new("00143", "B").batch("1024"),
        sequence,
        plan,
    ))
}

pub fn pcb() -> Result<Fixture, SequenceError> {
    let sequence = Sequence::builder("battery-pcb")
        .step(StepDefinition::string("flash_firmware_and_version", "v2.5.1", 10))
        .step(StepDefinition::boolean("configuration_battery_gauge", 2))
        .step(StepDefinition::boolean("get_calibration_values_and_internal_status", 2))
        .step(StepDefinition::numeric("overvoltage_protection", "V", Limits::range(4.20, 4.25), 3))
        .step(StepDefinition::numeric("undervoltage_protection", "V", Limits::range(2.5, 2.6), 3))
        .step(StepDefinition::boolean("led_and_button", 2))
        .step(StepDefinition::boolean("save_information_in_memory", 1))
        .step(StepDefinition::boolean("config_battery_gauge", 1))
        .step(StepDefinition::numeric("calibrate_temperature", "°C", Limits::range(20.0, 25.0), 3))
        .step(StepDefinition::boolean("visual_inspection", 5))
        .policy(AbortPolicy::RunAll)
        .build()?;

    let plan = SimulationPlan::new()
        .step("flash_firmware_and_version", Simulation::text(0.99, "v2.5.1", "unknown"))
        .step("configuration_battery_gauge", Simulation::flag(0.98))
        .step("get_calibration_values_and_internal_status", Simulation::flag(0.99))
        .step("overvoltage_protection", Simulation::number(0.98, (4.2, 4.25), (4.26, 5.6), 2))
        .step("undervoltage_protection", Simulation::number(0.98, (2.5, 2.6), (2.3, 2.4), 2))
        .step("led_and_button", Simulation::flag(0.95))
        .step("save_information_in_memory", Simulation::flag(0.99))
        .step("config_battery_gauge", Simulation::flag(0.99))
        .step("calibrate_temperature", Simulation::number(0.99, (20.0, 25.0), (15.0, 19.9), 1))
        .step("visual_inspection", Simulation::flag(1.0))
        .attach("visual_inspection", "assets/pcb_coating.jpeg");

    Ok(Fixture::new(
        "battery-pcb",
        "Battery management PCB: firmware, protections, calibration",
        "FVT1",
        UnitTemplate::new("00786", "A").batch("1024"),
        sequence,
        plan,
    ))
}

pub fn assembly() -> Result<Fixture, SequenceError> {
    let sequence = Sequence::builder("battery-assembly")
        .step(StepDefinition::boolean("battery_connection", 2))
        .step(StepDefinition::numeric("voltage_value", "V", Limits::range(10.0, 12.0), 3))
        .step(StepDefinition::numeric("internal_resistance", "mΩ", Limits::range(5.0, 15.0), 3))
        .step(StepDefinition::numeric("thermal_runaway_detection", "°C", Limits::range(55.0, 65.0), 10))
        .step(StepDefinition::numeric("state_of_health", "%", Limits::at_least(95.0), 5))
        .step(StepDefinition::numeric("state_of_charge", "%", Limits::range(40.0, 60.0), 5))
        .policy(AbortPolicy::RunAll)
        .build()?;

    let plan = SimulationPlan::new()
        .step("battery_connection", Simulation::flag(0.99))
        .step("voltage_value", Simulation::number(0.98, (10.0, 12.0), (8.0, 9.5), 1))
        .step("internal_resistance", Simulation::number(0.98, (10.0, 12.0), (15.1, 20.0), 1))
        .step("thermal_runaway_detection", Simulation::number(0.98, (55.0, 65.0), (66.0, 70.0), 2))
        .step("state_of_health", Simulation::number(0.98, (95.0, 100.0), (85.0, 94.0), 1))
        .step("state_of_charge", Simulation::number(0.99, (40.0, 60.0), (25.0, 35.0), 1));

    Ok(Fixture::new(
        "battery-assembly",
        "Smart battery final assembly of cell pack and PCB",
        "FVT1",
        UnitTemplate::new("SI02430", "B").batch("1024"),
        sequence,
        plan,
    )
    .sub_units(SubUnitSource::Fixed {
        serials: vec!["00786C4J26221".to_string(), "00143B4J73889".to_string()],
    })
    .report_variable("report_date", "{date}")
    .report_variable("serial_number", "{serial_number}")
    .report_variable("batch_number", "{batch_number}")
    .report_variable("voltage_test_result", "{step:voltage_value}")
    .report_variable("safety_test_result", "Passed all safety tests")
    .report_variable("internal_resistance", "{step:internal_resistance}"))
}
