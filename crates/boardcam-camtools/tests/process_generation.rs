use boardcam_camtools::{
    script_path, write_script, CamToolError, Command, DirectoryLayerSource, ProcessGenerator,
};
use boardcam_core::{BoardProject, Bounds, DrillHit, Layer, LayerSet, LayerSource, LayerType};
use boardcam_settings::{ConfigDocument, ConfigError};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;

const FULL_CONFIG: &str = r#"
alignment_holes:
  tool_size: 1.0
  cut_z: -2.0
  travel_z: 2.0
  feed_rate: 60
  spindle_speed: 12000
  multi_depth: true
  depth_per_pass: 0.6
  hole_size: 3.0
  hole_offset: 2.0
isolation_routing:
  tool_size: 0.1
  cut_z: -0.07
  travel_z: 2.0
  feed_rate: 100
  spindle_speed: 20000
  passes: 2
  pass_overlap: 0.5
edge_cuts:
  tool_size: 1.0
  cut_z: -1.8
  travel_z: 2.0
  feed_rate: 60
  spindle_speed: 12000
  margin: 0.1
  gap_size: 0.5
  gaps: 4
drill:
  vias:
    min_size: 0.5
    max_size: 1.0
    specs:
      - type: cnc_drill
        params: {tool_size: 0.8, cut_z: -1.8, drill_z: -1.9, travel_z: 2.0, feed_rate: 40, spindle_speed: 12000}
      - type: mill_holes
        params: {tool_size: 0.8, cut_z: -1.8, travel_z: 2.0, feed_rate: 60, spindle_speed: 12000}
"#;

fn board(extra_drill_tools: &[(u32, f64)]) -> BoardProject {
    let mut tools = BTreeMap::from([(1, 0.6), (2, 0.9)]);
    tools.extend(extra_drill_tools.iter().copied());
    let hits = vec![DrillHit::hole(1), DrillHit::hole(2), DrillHit::hole(2)];

    let layers: LayerSet = [
        Layer::gerber(
            LayerType::BCu,
            "/boards/demo/demo-B.Cu.gbl",
            Bounds::new((1.0, 99.0), (1.0, 79.0)),
        ),
        Layer::gerber(
            LayerType::FCu,
            "/boards/demo/demo-F.Cu.gtl",
            Bounds::new((1.0, 99.0), (1.0, 79.0)),
        ),
        Layer::gerber(
            LayerType::EdgeCuts,
            "/boards/demo/demo-Edge.Cuts.gm1",
            Bounds::new((0.0, 100.0), (0.0, 80.0)),
        ),
        Layer::excellon(
            "/boards/demo/demo.drl",
            Bounds::new((10.0, 90.0), (10.0, 70.0)),
            tools,
            hits,
        ),
    ]
    .into_iter()
    .collect();

    BoardProject::new("/boards/demo", layers)
}

fn render(commands: &[Command]) -> Vec<String> {
    commands.iter().map(ToString::to_string).collect()
}

#[test]
fn test_full_run_numbers_outputs_in_phase_order() {
    let config = ConfigDocument::from_yaml_str(FULL_CONFIG).unwrap();
    let commands = ProcessGenerator::new(board(&[]), config)
        .unwrap()
        .generate()
        .unwrap();

    let outputs: Vec<String> = commands
        .iter()
        .filter(|c| c.writes_output())
        .map(|c| c.args()[1].clone())
        .collect();

    assert_eq!(
        outputs,
        vec![
            "/boards/demo/01.alignment_holes.1.0.end_mill.gcode".to_string(),
            "/boards/demo/02.b_cu.0.1.engraving_bit.gcode".to_string(),
            "/boards/demo/03.f_cu.0.1.engraving_bit.gcode".to_string(),
            "/boards/demo/04.drill_vias.0.8.drill.gcode".to_string(),
            "/boards/demo/05.drill_vias.0.8.end_mill.gcode".to_string(),
            "/boards/demo/06.edge_cuts.1.0.end_mill.gcode".to_string(),
        ]
    );
    assert_eq!(commands.last().map(Command::name), Some("quit_flatcam"));
}

#[test]
fn test_full_run_script_text() {
    let config = ConfigDocument::from_yaml_str(FULL_CONFIG).unwrap();
    let commands = ProcessGenerator::new(board(&[]), config)
        .unwrap()
        .generate()
        .unwrap();

    let expected = vec![
        "open_gerber /boards/demo/demo-B.Cu.gbl -outname b_cu",
        "open_gerber /boards/demo/demo-F.Cu.gtl -outname f_cu",
        "open_gerber /boards/demo/demo-Edge.Cuts.gm1 -outname edge_cuts",
        "open_excellon /boards/demo/demo.drl -outname drill",
        "aligndrill edge_cuts -axis X -dia 3.0 -holes \"(3.5, -3.5),(96.5, -3.5)\" -dist 40.0",
        "mirror b_cu -axis X -box edge_cuts",
        "milldrills edge_cuts_aligndrill -tooldia 1.0 -milled_dias 3.0 -outname alignment_path",
        "cncjob alignment_path -z_cut -2.0 -z_move 2.0 -feedrate 60.0 -dia 1.0 -spindlespeed 12000 -dpp 0.6 -outname alignment_cnc",
        "write_gcode alignment_cnc /boards/demo/01.alignment_holes.1.0.end_mill.gcode",
        "isolate b_cu -dia 0.1 -passes 2 -overlap 0.5 -combine 1 -outname b_cu_path",
        "cncjob b_cu_path -z_cut -0.07 -z_move 2.0 -feedrate 100.0 -dia 0.1 -spindlespeed 20000 -outname b_cu_cnc",
        "write_gcode b_cu_cnc /boards/demo/02.b_cu.0.1.engraving_bit.gcode",
        "isolate f_cu -dia 0.1 -passes 2 -overlap 0.5 -combine 1 -outname f_cu_path",
        "cncjob f_cu_path -z_cut -0.07 -z_move 2.0 -feedrate 100.0 -dia 0.1 -spindlespeed 20000 -outname f_cu_cnc",
        "write_gcode f_cu_cnc /boards/demo/03.f_cu.0.1.engraving_bit.gcode",
        "drillcncjob drill -drilled_dias 0.6,0.9 -drillz -1.9 -travelz 2.0 -feedrate_z 40.0 -spindlespeed 12000 -outname drill_vias_0",
        "write_gcode drill_vias_0 /boards/demo/04.drill_vias.0.8.drill.gcode",
        "milldrills drill -tooldia 0.8 -milled_dias 0.6,0.9 -outname drill_vias_1",
        "cncjob drill_vias_1 -z_cut -1.8 -z_move 2.0 -feedrate 60.0 -dia 0.8 -spindlespeed 12000 -outname drill_vias_1_cnc",
        "write_gcode drill_vias_1_cnc /boards/demo/05.drill_vias.0.8.end_mill.gcode",
        "cutout edge_cuts -dia 1.0 -margin 0.1 -gapsize 0.5 -gaps 4",
        "cncjob edge_cuts_cutout -z_cut -1.8 -z_move 2.0 -feedrate 60.0 -dia 1.0 -spindlespeed 12000 -outname edge_cuts_cnc",
        "write_gcode edge_cuts_cnc /boards/demo/06.edge_cuts.1.0.end_mill.gcode",
        "quit_flatcam",
    ];

    assert_eq!(render(&commands), expected);
}

#[test]
fn test_explicit_size_profile_wins_for_its_tool() {
    let config = ConfigDocument::from_yaml_str(
        r#"
drill:
  ranged:
    min_size: 0.5
    max_size: 1.0
    specs:
      - type: cnc_drill
        params: {tool_size: 0.8, cut_z: -1.8, travel_z: 2.0, feed_rate: 40, spindle_speed: 12000}
  exact:
    sizes: [0.8]
    specs:
      - type: cnc_drill
        params: {tool_size: 0.8, cut_z: -1.8, travel_z: 2.0, feed_rate: 40, spindle_speed: 12000}
"#,
    )
    .unwrap();
    let drill = Layer::excellon(
        "/boards/demo/demo.drl",
        Bounds::default(),
        BTreeMap::from([(1, 0.8)]),
        vec![DrillHit::hole(1)],
    );
    let project = BoardProject::new("/boards/demo", [drill].into_iter().collect());

    let commands = ProcessGenerator::new(project, config).unwrap().generate().unwrap();
    let rendered = render(&commands);

    assert!(rendered.iter().any(|line| line.contains("-outname drill_exact_0")));
    assert!(!rendered.iter().any(|line| line.contains("ranged")));
}

#[test]
fn test_tool_without_hits_is_never_drilled() {
    let config = ConfigDocument::from_yaml_str(FULL_CONFIG).unwrap();
    let commands = ProcessGenerator::new(board(&[(7, 0.75)]), config)
        .unwrap()
        .generate()
        .unwrap();

    for command in commands.iter().filter(|c| c.name() == "drillcncjob" || c.name() == "milldrills") {
        assert!(!command.to_string().contains("0.75"), "{}", command);
    }
}

#[test]
fn test_unmatched_tool_is_omitted_not_fatal() {
    let config = ConfigDocument::from_yaml_str(FULL_CONFIG).unwrap();
    let mut project = board(&[]);
    let mut drill = project.layers.get(LayerType::Drill).unwrap().clone();
    drill.tools.insert(9, 4.0);
    drill.hits.push(DrillHit::hole(9));
    project.layers.insert(drill);

    let commands = ProcessGenerator::new(project, config).unwrap().generate().unwrap();
    let rendered = render(&commands);

    assert!(rendered.iter().any(|l| l.contains("-drilled_dias 0.6,0.9 ")));
    assert!(!rendered.iter().any(|l| l.contains("4.0,") || l.contains(",4.0")));
}

#[test]
fn test_bogus_operation_rejected_before_generation() {
    let yaml = r#"
drill:
  vias:
    specs:
      - type: bogus
        params: {tool_size: 0.8, cut_z: -1.8, travel_z: 2.0, feed_rate: 40, spindle_speed: 12000}
"#;
    let err = ConfigDocument::from_yaml_str(yaml).unwrap_err();
    assert!(matches!(err, ConfigError::Malformed(_)));
}

#[test]
fn test_invalid_merged_config_rejected_by_generator() {
    let mut config = ConfigDocument::from_yaml_str(FULL_CONFIG).unwrap();
    if let Some(spec) = config.isolation_routing.as_mut() {
        spec.passes = 0.0;
    }

    let err = ProcessGenerator::new(board(&[]), config).unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn test_missing_edge_cuts_aborts_cutout() {
    let config = ConfigDocument::from_yaml_str(FULL_CONFIG).unwrap();
    let mut config_without_alignment = config.clone();
    config_without_alignment.alignment_holes = None;

    let mut project = board(&[]);
    project.layers = project
        .layers
        .iter()
        .filter(|layer| layer.layer_type != LayerType::EdgeCuts)
        .cloned()
        .collect();

    let results: Vec<_> = ProcessGenerator::new(project, config_without_alignment)
        .unwrap()
        .processes()
        .collect();

    let last = results.last().unwrap();
    assert!(matches!(
        last,
        Err(CamToolError::Layer(boardcam_core::Error::MissingLayer(LayerType::EdgeCuts)))
    ));
    assert!(results[..results.len() - 1].iter().all(Result::is_ok));
    assert!(!results
        .iter()
        .flatten()
        .any(|command| command.name() == "quit_flatcam"));
}

#[test]
fn test_directory_board_to_script() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("demo-Edge.Cuts.gm1"),
        "%FSLAX46Y46*%\n%MOMM*%\n%ADD10C,0.100000*%\nD10*\nX0Y0D02*\nX100000000Y0D01*\nX100000000Y80000000D01*\nX0Y80000000D01*\nX0Y0D01*\nM02*\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("demo.drl"),
        "M48\nMETRIC\nT1C0.800\n%\nT1\nX10.0Y10.0\nM30\n",
    )
    .unwrap();

    let config = ConfigDocument::from_yaml_str(
        r#"
edge_cuts:
  tool_size: 1.0
  cut_z: -1.8
  travel_z: 2.0
  feed_rate: 60
  spindle_speed: 12000
  margin: 0.1
  gap_size: 0.5
  gaps: tb
"#,
    )
    .unwrap();

    let project = DirectoryLayerSource::new(dir.path()).load().unwrap();
    let script = script_path(dir.path());
    let count = write_script(
        &script,
        ProcessGenerator::new(project, config).unwrap().processes(),
    )
    .unwrap();

    let text = std::fs::read_to_string(&script).unwrap();
    assert_eq!(count, text.lines().count());
    assert_eq!(count, 6);
    assert!(text.contains("cutout edge_cuts -dia 1.0 -margin 0.1 -gapsize 0.5 -gaps tb\n"));
    assert!(text.ends_with("quit_flatcam\n"));
}
