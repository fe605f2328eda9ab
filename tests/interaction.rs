use glam::{Vec2, Vec3};
use orbit_viewer::{AssetLoader, Geometry, InputEvent, Scene, Viewer};

const SCENE: &str = r#"
<scene>
    <object>
        <name>Camera</name>
        <type>camera</type>
        <position>0 0 10</position>
    </object>
    <object>
        <name>Ball</name>
        <type>sphere</type>
        <scale>3 3 3</scale>
    </object>
    <object>
        <name>Tri</name>
        <type>model</type>
        <mesh>tri.obj</mesh>
        <position>4 0 0</position>
    </object>
</scene>
"#;

const TRIANGLE: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
const CENTER: Vec2 = Vec2::new(400.0, 300.0);

fn viewer_with(assets: AssetLoader) -> Viewer {
    let scene = Scene::from_xml(SCENE).unwrap();
    let mut viewer = Viewer::new(&scene, assets, 0.0);
    viewer.handle_input(
        InputEvent::Resize {
            width: 800,
            height: 600,
        },
        0.0,
    );
    viewer
}

fn ball_height(viewer: &Viewer) -> f32 {
    viewer.world().find("Ball").unwrap().position.y
}

#[test]
fn double_click_eases_the_target_onto_the_clicked_point() {
    let mut viewer = viewer_with(AssetLoader::in_memory());
    viewer.handle_input(InputEvent::Click { position: CENTER }, 0.0);
    viewer.handle_input(InputEvent::Click { position: CENTER }, 120.0);

    viewer.tick(870.0);
    let halfway = viewer.camera().target.z;
    assert!(halfway > 1.0 && halfway < 1.5, "target.z = {halfway}");

    viewer.tick(1_620.0);
    assert!(viewer.camera().target.distance(Vec3::new(0.0, 0.0, 1.5)) < 1e-3);
    assert_eq!(ball_height(&viewer), 0.0);
}

#[test]
fn clicking_a_bouncing_ball_restarts_from_its_resting_height() {
    let mut viewer = viewer_with(AssetLoader::in_memory());
    viewer.handle_input(InputEvent::Click { position: CENTER }, 0.0);
    viewer.tick(200.0);
    viewer.tick(400.0);
    assert!(ball_height(&viewer) > 0.5);

    viewer.handle_input(InputEvent::Click { position: CENTER }, 450.0);
    viewer.tick(650.0);
    let ball = viewer.world().find("Ball").unwrap().id;
    assert_eq!(viewer.bounces().entry(ball).unwrap().original_y, 0.0);

    viewer.tick(2_200.0);
    assert_eq!(ball_height(&viewer), 0.0);
    assert_eq!(viewer.bounces().active_count(), 0);
}

#[test]
fn tap_on_touch_screen_bounces() {
    let mut viewer = viewer_with(AssetLoader::in_memory());
    viewer.handle_input(
        InputEvent::TouchStart {
            id: 7,
            position: CENTER,
        },
        0.0,
    );
    viewer.handle_input(InputEvent::TouchEnd { id: 7 }, 50.0);
    viewer.tick(300.0);
    assert_eq!(viewer.bounces().active_count(), 1);
}

#[test]
fn registered_model_appears_after_the_next_tick() {
    let mut assets = AssetLoader::in_memory();
    assets.insert("tri.obj", TRIANGLE).unwrap();
    let mut viewer = viewer_with(assets);
    assert!(viewer.world().find("Tri").is_none());

    let frame = viewer.tick(16.0);
    let tri = viewer.world().find("Tri").unwrap();
    assert_eq!(tri.position, Vec3::new(4.0, 0.0, 0.0));
    assert!(matches!(&tri.geometry, Geometry::Mesh { name, .. } if name == "tri.obj"));
    assert!(viewer.mesh("tri.obj").is_some());
    assert_eq!(frame.items.len(), 2);
    assert_eq!(viewer.pending_assets(), 0);
}

#[test]
fn missing_model_is_never_spawned() {
    let mut viewer = viewer_with(AssetLoader::in_memory());
    for frame in 1..=10 {
        viewer.tick(f64::from(frame) * 16.0);
    }
    assert!(viewer.world().find("Tri").is_none());
    assert_eq!(viewer.world().len(), 1);
    assert_eq!(viewer.pending_assets(), 0);
}
