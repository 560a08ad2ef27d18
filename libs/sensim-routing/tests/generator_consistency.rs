//! Generated campus maps stay consistent at full scale

#![allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable

use std::collections::{HashMap, HashSet};

use sensim_model::SimulationType;
use sensim_routing::generator::GeneratorSettings;
use sensim_routing::{
    generate, GeneratorPresets, MapPaths, ModbusCategory, ObjectType, PointTemplate,
    ProjectionMaps, RegisterTable,
};

fn campus_templates() -> Vec<PointTemplate> {
    vec![
        PointTemplate::new("zone_temp", "C", 21.0, 15.0, 30.0).with_modbus(ModbusCategory::Ir),
        PointTemplate::new("humidity", "%", 45.0, 20.0, 80.0)
            .with_modbus(ModbusCategory::Ir)
            .with_simulation(SimulationType::BoundedRandomWalk),
        PointTemplate::new("setpoint", "C", 21.0, 16.0, 28.0)
            .with_modbus(ModbusCategory::Hr)
            .with_writable(true),
        PointTemplate::new("fan_status", "bool", 0.0, 0.0, 1.0)
            .with_modbus(ModbusCategory::Di)
            .with_simulation(SimulationType::DutyCycleStep),
        PointTemplate::new("energy", "kWh", 100.0, 0.0, 1000.0)
            .with_simulation(SimulationType::SawtoothRamp),
    ]
}

#[test]
fn fifty_buildings_project_every_point_once() {
    let templates = campus_templates();
    let presets = GeneratorPresets {
        settings: GeneratorSettings { num_buildings: 50 },
        templates: templates.clone(),
    };
    let config = generate(&presets).unwrap();
    assert_eq!(config.points.len(), 50 * templates.len());

    // Contiguous addresses from each table base
    for (table, per_building) in [
        (RegisterTable::InputRegisters, 2u32),
        (RegisterTable::HoldingRegisters, 1),
        (RegisterTable::DiscreteInputs, 1),
    ] {
        let addresses: Vec<u32> = config.registers.table(table).map(|(a, _)| a).collect();
        let expected: Vec<u32> = (table.base()..table.base() + 50 * per_building).collect();
        assert_eq!(addresses, expected, "{} addresses", table);
    }
    assert_eq!(config.registers.table(RegisterTable::Coils).count(), 0);

    // Exactly one object and one topic per point
    let by_point = config.objects.by_point();
    let mut topics = HashSet::new();
    for def in &config.points {
        assert_eq!(by_point[def.name.as_str()].len(), 1, "{}", def.name);
        assert!(topics.insert(config.topics.topic(&def.name).unwrap()));
    }

    let mut per_type: HashMap<ObjectType, Vec<u32>> = HashMap::new();
    for (id, _) in config.objects.iter() {
        per_type.entry(id.object_type).or_default().push(id.instance);
    }
    assert_eq!(per_type[&ObjectType::BinaryValue], (1..=50).collect::<Vec<_>>());
    assert_eq!(per_type[&ObjectType::AnalogValue], (1..=200).collect::<Vec<_>>());
}

#[test]
fn written_files_load_back_as_projection() {
    let dir = tempfile::tempdir().unwrap();
    let presets = GeneratorPresets {
        settings: GeneratorSettings { num_buildings: 3 },
        templates: campus_templates(),
    };
    let config = generate(&presets).unwrap();
    config.write_to_dir(dir.path()).unwrap();

    let points =
        sensim_model::load_point_set(&dir.path().join(sensim_routing::generator::SENSORS_FILE))
            .unwrap();
    let paths = MapPaths {
        registers: Some(dir.path().join(sensim_routing::generator::REGISTER_MAP_FILE)),
        objects: Some(dir.path().join(sensim_routing::generator::OBJECT_MAP_FILE)),
        topics: Some(dir.path().join(sensim_routing::generator::TOPIC_MAP_FILE)),
    };
    let maps = ProjectionMaps::load(&paths, &points);

    assert_eq!(maps.registers, config.registers);
    assert_eq!(maps.objects, config.objects);
    assert_eq!(maps.topics, config.topics);

    let labels = maps.protocol_labels();
    assert_eq!(
        labels["building_2_setpoint"],
        vec!["Modbus HR:40002", "BACnet AV:7"]
    );
}
