use crate::{
    ir::{ChannelFunction, Opcode, Special, Value},
    program::Program,
};
use std::fmt::Write;

pub const VARYING_SHADE: &str = "vShade";
pub const VARYING_SUBPROGRAM: &str = "vSubprogram";
pub const VARYING_TEXTURE0_BOUNDS: &str = "vTexture0Bounds";
pub const VARYING_TEXTURE1_BOUNDS: &str = "vTexture1Bounds";
pub const UNIFORM_TEXTURE0: &str = "uTexture0";
pub const UNIFORM_TEXTURE1: &str = "uTexture1";

const LOCAL_TEXTURE0: &str = "texture0Color";
const LOCAL_TEXTURE1: &str = "texture1Color";
const LOCAL_RGB: &str = "fragRGB";
const LOCAL_ALPHA: &str = "fragA";

#[derive(Clone, Debug, Default)]
pub struct EmitOptions {
    /// Shading language text placed before the generated `main`, it has to declare
    /// the inputs named by the `VARYING_*` and `UNIFORM_*` constants and `AtlasUv`
    pub preamble: String,
}

/// Generate the fragment shader of a program.
///
/// The output only depends on the preamble and the program, generating twice gives
/// identical text.
pub fn generate_fragment_shader(options: &EmitOptions, program: &Program) -> String {
    assert!(!program.subprograms.is_empty(), "{} has no subprograms", program.id);

    let mut codegen = FragmentCodegen::new(options);
    codegen.emit_locals(program.register_count());
    for (branch, subprogram) in program.subprograms.iter().enumerate() {
        codegen.emit_branch_begin(branch);
        codegen.emit_function(&subprogram.rgb, LOCAL_RGB);
        codegen.emit_function(&subprogram.alpha, LOCAL_ALPHA);
    }
    codegen.finish()
}

pub struct FragmentCodegen {
    buffer: String,
}

impl FragmentCodegen {
    pub fn new(options: &EmitOptions) -> Self {
        let mut buffer = String::with_capacity(options.preamble.len() + 1024);
        buffer.push_str(&options.preamble);
        if !buffer.is_empty() && !buffer.ends_with('\n') {
            buffer.push('\n');
        }
        buffer.push_str("void main(void) {\n");

        Self { buffer }
    }

    pub fn emit_locals(&mut self, registers: usize) {
        writeln!(
            &mut self.buffer,
            "    vec4 {LOCAL_TEXTURE0} = texture2D({UNIFORM_TEXTURE0}, AtlasUv({VARYING_TEXTURE0_BOUNDS}));"
        )
        .ok();
        writeln!(
            &mut self.buffer,
            "    vec4 {LOCAL_TEXTURE1} = texture2D({UNIFORM_TEXTURE1}, AtlasUv({VARYING_TEXTURE1_BOUNDS}));"
        )
        .ok();
        writeln!(&mut self.buffer, "    vec4 {LOCAL_RGB};").ok();
        writeln!(&mut self.buffer, "    vec4 {LOCAL_ALPHA};").ok();
        for index in 0..registers {
            writeln!(&mut self.buffer, "    vec4 r{index};").ok();
        }
    }

    pub fn emit_branch_begin(&mut self, branch: usize) {
        match branch {
            0 => writeln!(&mut self.buffer, "    if ({VARYING_SUBPROGRAM} == 0.0) {{").ok(),
            _ => writeln!(&mut self.buffer, "    }} else if ({VARYING_SUBPROGRAM} == {branch}.0) {{").ok(),
        };
    }

    pub fn emit_function(&mut self, function: &ChannelFunction, output: &str) {
        for instruction in &function.instructions {
            self.buffer.push_str("        ");
            self.emit_value(function, instruction.destination, output);
            self.buffer.push_str(" = ");
            self.emit_value(function, instruction.operands[0], output);

            let operator = match instruction.opcode {
                Opcode::Move => None,
                Opcode::Add => Some('+'),
                Opcode::Sub => Some('-'),
                Opcode::Mul => Some('*'),
            };
            if let Some(operator) = operator {
                write!(&mut self.buffer, " {operator} ").ok();
                self.emit_value(function, instruction.operands[1], output);
            }

            self.buffer.push_str(";\n");
        }
    }

    fn emit_value(&mut self, function: &ChannelFunction, value: Value, output: &str) {
        match value {
            Value::Register(index) => write!(&mut self.buffer, "r{index}").ok(),
            Value::Constant(index) => {
                let [r, g, b, a] = function.constant(index).to_f32();
                write!(&mut self.buffer, "vec4({r:.6}, {g:.6}, {b:.6}, {a:.6})").ok()
            }
            Value::Special(special) => match special {
                Special::Texel0 => write!(&mut self.buffer, "{LOCAL_TEXTURE0}").ok(),
                Special::Texel0Alpha => write!(&mut self.buffer, "{LOCAL_TEXTURE0}.aaaa").ok(),
                Special::Texel1 => write!(&mut self.buffer, "{LOCAL_TEXTURE1}").ok(),
                Special::Texel1Alpha => write!(&mut self.buffer, "{LOCAL_TEXTURE1}.aaaa").ok(),
                Special::Shade => write!(&mut self.buffer, "{VARYING_SHADE}").ok(),
                Special::Output => write!(&mut self.buffer, "{output}").ok(),
            },
        };
    }

    pub fn finish(mut self) -> String {
        self.buffer.push_str("    }\n");
        writeln!(&mut self.buffer, "    gl_FragColor = vec4({LOCAL_RGB}.rgb, {LOCAL_ALPHA}.a);").ok();
        self.buffer.push_str("}\n");
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Rgba8,
        combiner::{AlphaSource, CombinerDescriptor, CombinerStage, RgbSource, ShaderContext},
        program::{ProgramCache, ProgramDescriptor},
        subprogram::SubprogramCache,
    };
    use pretty_assertions::assert_eq;

    fn combiner(rgb: CombinerStage<RgbSource>, alpha: CombinerStage<AlphaSource>) -> CombinerDescriptor {
        CombinerDescriptor {
            rgb: [rgb; 2],
            alpha: [alpha; 2],
        }
    }

    #[test]
    fn emits_dispatch_ladder() {
        let mut subprograms = SubprogramCache::new();
        let context = ShaderContext {
            primitive: Rgba8::new(255, 0, 51, 255),
            environment: Rgba8::ZERO,
            two_cycle: false,
        };

        let (modulate, ..) = subprograms.get_or_create(
            &combiner(
                CombinerStage::new(RgbSource::Texel0, RgbSource::Zero, RgbSource::Shade, RgbSource::Zero),
                CombinerStage::new(AlphaSource::Zero, AlphaSource::Zero, AlphaSource::Zero, AlphaSource::Texel0),
            ),
            &context,
        );
        let (flat, ..) = subprograms.get_or_create(
            &combiner(
                CombinerStage::new(RgbSource::Zero, RgbSource::Zero, RgbSource::Zero, RgbSource::Primitive),
                CombinerStage::new(AlphaSource::Zero, AlphaSource::Zero, AlphaSource::Zero, AlphaSource::One),
            ),
            &context,
        );

        let mut programs = ProgramCache::new(4);
        let lookup = programs.get_or_create(&subprograms, ProgramDescriptor(vec![modulate, flat]));
        let options = EmitOptions {
            preamble: "uniform sampler2D uTexture0;".to_string(),
        };

        let expected = "\
uniform sampler2D uTexture0;
void main(void) {
    vec4 texture0Color = texture2D(uTexture0, AtlasUv(vTexture0Bounds));
    vec4 texture1Color = texture2D(uTexture1, AtlasUv(vTexture1Bounds));
    vec4 fragRGB;
    vec4 fragA;
    vec4 r0;
    if (vSubprogram == 0.0) {
        r0 = texture0Color * vShade;
        fragRGB = r0;
        fragA = texture0Color;
    } else if (vSubprogram == 1.0) {
        fragRGB = vec4(1.000000, 0.000000, 0.200000, 1.000000);
        fragA = vec4(1.000000, 1.000000, 1.000000, 1.000000);
    }
    gl_FragColor = vec4(fragRGB.rgb, fragA.a);
}
";
        assert_eq!(generate_fragment_shader(&options, &lookup.program), expected);
    }

    #[test]
    fn emission_is_deterministic_and_order_sensitive() {
        let mut subprograms = SubprogramCache::new();
        let ids: Vec<_> = [RgbSource::Texel0, RgbSource::Texel1]
            .into_iter()
            .map(|source| {
                let descriptor = combiner(
                    CombinerStage::new(RgbSource::Zero, RgbSource::Zero, RgbSource::Zero, source),
                    CombinerStage::new(AlphaSource::Zero, AlphaSource::Zero, AlphaSource::Zero, AlphaSource::One),
                );
                subprograms.get_or_create(&descriptor, &ShaderContext::default()).0
            })
            .collect();

        let mut programs = ProgramCache::new(4);
        let forward = programs.get_or_create(&subprograms, ProgramDescriptor(vec![ids[0], ids[1]]));
        let backward = programs.get_or_create(&subprograms, ProgramDescriptor(vec![ids[1], ids[0]]));

        let options = EmitOptions::default();
        let text = generate_fragment_shader(&options, &forward.program);
        assert_eq!(text, generate_fragment_shader(&options, &forward.program));
        assert_ne!(text, generate_fragment_shader(&options, &backward.program));
        assert!(text.starts_with("void main(void) {\n"));
        assert!(!text.contains("vec4 r0;"));
    }

    #[test]
    fn texel_alpha_broadcasts_the_texel_local() {
        let mut subprograms = SubprogramCache::new();
        let alpha = CombinerStage::new(AlphaSource::Zero, AlphaSource::Zero, AlphaSource::Zero, AlphaSource::One);
        let ids = [
            CombinerStage::new(RgbSource::Texel1, RgbSource::Zero, RgbSource::Texel0Alpha, RgbSource::Zero),
            CombinerStage::new(RgbSource::Zero, RgbSource::Zero, RgbSource::Zero, RgbSource::Texel1Alpha),
        ]
        .map(|rgb| subprograms.get_or_create(&combiner(rgb, alpha), &ShaderContext::default()).0);

        let mut programs = ProgramCache::new(4);
        let lookup = programs.get_or_create(&subprograms, ProgramDescriptor(ids.to_vec()));
        let text = generate_fragment_shader(&EmitOptions::default(), &lookup.program);

        assert!(text.contains(&format!("{LOCAL_TEXTURE1} * {LOCAL_TEXTURE0}.aaaa;")));
        assert!(text.contains(&format!("{LOCAL_RGB} = {LOCAL_TEXTURE1}.aaaa;")));
    }
}
