use bytemuck::{Pod, Zeroable};

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub(crate) struct GlobalUniform {
    pub view_proj: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
    /// rgb premultiplied by intensity.
    pub ambient: [f32; 4],
    /// Unit vector pointing at the light.
    pub light_direction: [f32; 4],
    /// rgb color, intensity in w.
    pub light_color: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub(crate) struct ObjectConstants {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 3],
    pub color: [f32; 4],
    /// x = roughness, y = metalness.
    pub material: [f32; 4],
}

pub(crate) const SHADER: &str = r#"
struct GlobalUniform {
    view_proj: mat4x4<f32>,
    camera_position: vec4<f32>,
    ambient: vec4<f32>,
    light_direction: vec4<f32>,
    light_color: vec4<f32>,
}

struct ObjectConstants {
    model: mat4x4<f32>,
    normal: mat3x4<f32>,
    color: vec4<f32>,
    material: vec4<f32>,
}

@group(0) @binding(0)
var<uniform> globals: GlobalUniform;

@group(1) @binding(0)
var<uniform> object: ObjectConstants;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
}

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) world_pos: vec3<f32>,
    @location(1) normal: vec3<f32>,
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    let world_position = object.model * vec4<f32>(input.position, 1.0);
    out.position = globals.view_proj * world_position;
    out.world_pos = world_position.xyz;
    let world_normal = mat3x3<f32>(
        object.normal[0].xyz,
        object.normal[1].xyz,
        object.normal[2].xyz
    ) * input.normal;
    out.normal = normalize(world_normal);
    return out;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    var normal = normalize(input.normal);
    let view_dir = normalize(globals.camera_position.xyz - input.world_pos);
    // Planes are double sided.
    if (dot(normal, view_dir) < 0.0) {
        normal = -normal;
    }
    let light_dir = normalize(globals.light_direction.xyz);
    let roughness = clamp(object.material.x, 0.04, 1.0);
    let metalness = clamp(object.material.y, 0.0, 1.0);
    let base = object.color.rgb;

    let diffuse = max(dot(normal, light_dir), 0.0) * (1.0 - metalness);
    let half_dir = normalize(light_dir + view_dir);
    let shininess = 2.0 / (roughness * roughness * roughness * roughness) - 2.0;
    let specular = pow(max(dot(normal, half_dir), 0.0), max(shininess, 1.0)) * (1.0 - roughness);
    let specular_color = mix(vec3<f32>(0.04), base, metalness);

    let light = globals.light_color.rgb * globals.light_color.w;
    let lit = globals.ambient.rgb * base
        + light * (diffuse * base + specular * specular_color);
    return vec4<f32>(lit, object.color.a);
}
"#;
