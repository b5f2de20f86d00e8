//! Minimal line-based text format for building graphs
use super::{Child, Graph, InstanceAddKind, Node, Op};
use crate::data::{
    ArithmeticOp, BlendType, ConstantResource, Image, ImageFormat,
    ParameterDesc,
};
use crate::Error;

use ordered_float::OrderedFloat;
use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Read};
use std::str::FromStr;

/// Token cursor over the arguments of a single line
struct Args<'a, I> {
    iter: I,
    line: usize,
    seen: &'a BTreeMap<String, Node>,
}

impl<'a, I: Iterator<Item = &'a str>> Args<'a, I> {
    fn next(&mut self) -> Result<&'a str, Error> {
        self.iter.next().ok_or(Error::MissingArgument(self.line))
    }

    fn parse<T: FromStr>(&mut self) -> Result<T, Error> {
        let s = self.next()?;
        s.parse()
            .map_err(|_| Error::BadArgument(s.to_owned(), self.line))
    }

    /// Looks up a node label; `_` is a missing child
    fn child(&mut self) -> Result<Child, Error> {
        match self.next()? {
            "_" => Ok(None),
            s => self.node_by_name(s).map(Some),
        }
    }

    fn node(&mut self) -> Result<Node, Error> {
        let s = self.next()?;
        self.node_by_name(s)
    }

    fn node_by_name(&self, s: &str) -> Result<Node, Error> {
        self.seen
            .get(s)
            .cloned()
            .ok_or_else(|| Error::UnknownNode(s.to_owned()))
    }

    fn rest(&mut self) -> Vec<&'a str> {
        self.iter.by_ref().collect()
    }
}

impl Graph {
    /// Parses a flat text representation of a graph
    ///
    /// Each line has the form `<id> <opcode> <args...>`; blank lines and lines
    /// beginning with `#` are ignored.  Children are referred to by `id`, and
    /// `_` stands for a missing child.  The node on the last line is
    /// registered as a root and returned.
    ///
    /// ```
    /// # use kiln::graph::Graph;
    /// let txt = "
    /// ## simple boolean expression
    /// _0 param-bool enabled false
    /// _1 bool true
    /// _2 and _0 _1
    /// ";
    /// let (g, root) = Graph::from_text(txt.as_bytes()).unwrap();
    /// assert_eq!(g.live_count(), 3);
    /// assert_eq!(g.roots(), &[root]);
    /// ```
    ///
    /// Supported opcodes:
    ///
    /// | Opcode | Arguments |
    /// |--------|-----------|
    /// | `bool`, `int`, `scalar`, `string` | value |
    /// | `color` | `r g b a` |
    /// | `param-bool`, `param-scalar` | name, default |
    /// | `param-int` | name, then the possible values |
    /// | `and`, `or` | two bool nodes |
    /// | `not` | bool node |
    /// | `eq` | int node, constant |
    /// | `add`, `sub`, `mul`, `div` | two nodes of the same type |
    /// | `if` | condition, yes, no |
    /// | `switch` | variable, default, then `value node` pairs |
    /// | `image` | width, height, lods, format |
    /// | `plain-color` | color node, width, height, format, lods |
    /// | `mipmap` | image node, levels |
    /// | `pixel-format` | image node, format |
    /// | `resize` | image node, width, height |
    /// | `layer-color` | image node, color node, mask node, blend |
    /// | `instance-image` | image node, name |
    /// | `instance-lod` | instance nodes |
    ///
    /// This representation is loosely defined and only intended for use in
    /// quick experiments and tests.
    pub fn from_text<R: Read>(r: R) -> Result<(Self, Node), Error> {
        let reader = BufReader::new(r);
        let mut g = Self::new();
        let mut seen = BTreeMap::new();
        let mut last = None;

        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut words = line.split_whitespace();
            let Some(name) = words.next() else { continue };
            let opcode = words.next().ok_or(Error::MissingArgument(i + 1))?;
            let mut args = Args {
                iter: words,
                line: i + 1,
                seen: &seen,
            };
            let op = parse_op(&g, opcode, &mut args)?;
            let node = g.try_insert(op)?;
            seen.insert(name.to_owned(), node);
            last = Some(node);
        }
        match last {
            Some(node) => {
                g.add_root(node);
                Ok((g, node))
            }
            None => Err(Error::EmptyFile),
        }
    }
}

fn parse_op<'a, I: Iterator<Item = &'a str>>(
    g: &Graph,
    opcode: &str,
    args: &mut Args<'a, I>,
) -> Result<Op, Error> {
    let op = match opcode {
        "bool" => Op::BoolConstant(args.parse()?),
        "int" => Op::IntConstant(args.parse()?),
        "scalar" => Op::ScalarConstant(OrderedFloat(args.parse()?)),
        "string" => Op::StringConstant(args.next()?.to_owned()),
        "color" => {
            let mut c = [OrderedFloat(0.0); 4];
            for v in c.iter_mut() {
                *v = OrderedFloat(args.parse()?);
            }
            Op::ColorConstant(c)
        }
        "param-bool" => {
            let name = args.next()?;
            let desc = ParameterDesc::new_bool(name, args.parse()?);
            Op::Parameter {
                ty: super::DataType::Bool,
                desc,
            }
        }
        "param-scalar" => {
            let name = args.next()?;
            let desc = ParameterDesc::new_float(name, args.parse()?);
            Op::Parameter {
                ty: super::DataType::Scalar,
                desc,
            }
        }
        "param-int" => {
            let name = args.next()?;
            let line = args.line;
            let values = args
                .rest()
                .into_iter()
                .map(|s| {
                    s.parse::<i32>()
                        .map_err(|_| Error::BadArgument(s.to_owned(), line))
                })
                .collect::<Result<Vec<_>, _>>()?;
            let labels = values.iter().map(|v| v.to_string()).collect::<Vec<_>>();
            let pairs = values
                .iter()
                .zip(&labels)
                .map(|(v, s)| (*v, s.as_str()))
                .collect::<Vec<_>>();
            Op::Parameter {
                ty: super::DataType::Int,
                desc: ParameterDesc::new_int(name, &pairs),
            }
        }
        "and" => Op::BoolAnd {
            a: args.child()?,
            b: args.child()?,
        },
        "or" => Op::BoolOr {
            a: args.child()?,
            b: args.child()?,
        },
        "not" => Op::BoolNot { a: args.child()? },
        "eq" => Op::IntEqualConst {
            value: args.child()?,
            constant: args.parse()?,
        },
        "add" | "sub" | "mul" | "div" => {
            let op = match opcode {
                "add" => ArithmeticOp::Add,
                "sub" => ArithmeticOp::Sub,
                "mul" => ArithmeticOp::Mul,
                _ => ArithmeticOp::Div,
            };
            let a = args.node()?;
            let b = args.node()?;
            Op::Arithmetic {
                ty: g.data_type(a),
                op,
                a: Some(a),
                b: Some(b),
            }
        }
        "if" => {
            let condition = args.child()?;
            let yes = args.child()?;
            let no = args.child()?;
            let ty = yes
                .or(no)
                .map(|n| g.data_type(n))
                .ok_or(Error::MissingArgument(args.line))?;
            Op::Conditional {
                ty,
                condition,
                yes,
                no,
            }
        }
        "switch" => {
            let variable = args.child()?;
            let default = args.child()?;
            let rest = args.rest();
            if rest.len() % 2 != 0 {
                return Err(Error::MissingArgument(args.line));
            }
            let mut cases = vec![];
            for pair in rest.chunks(2) {
                let condition = pair[0].parse().map_err(|_| {
                    Error::BadArgument(pair[0].to_owned(), args.line)
                })?;
                let branch = args.node_by_name(pair[1])?;
                cases.push(super::SwitchCase {
                    condition,
                    branch: Some(branch),
                });
            }
            let ty = cases
                .first()
                .and_then(|c| c.branch)
                .or(default)
                .map(|n| g.data_type(n))
                .ok_or(Error::MissingArgument(args.line))?;
            Op::Switch {
                ty,
                variable,
                default,
                cases,
            }
        }
        "image" => {
            let w = args.parse()?;
            let h = args.parse()?;
            let lods = args.parse()?;
            let format: ImageFormat = args.parse()?;
            Op::ImageConstant(ConstantResource::new(Image::from_fn(
                w,
                h,
                lods,
                format,
                |lod, i| lod.wrapping_mul(64).wrapping_add(i as u8),
            )))
        }
        "plain-color" => Op::ImagePlainColor {
            color: args.child()?,
            size: [args.parse()?, args.parse()?],
            format: args.parse()?,
            lods: args.parse()?,
        },
        "mipmap" => Op::ImageMipmap {
            source: args.child()?,
            levels: args.parse()?,
            only_tail: false,
        },
        "pixel-format" => Op::ImagePixelFormat {
            source: args.child()?,
            format: args.parse()?,
        },
        "resize" => Op::ImageResize {
            source: args.child()?,
            size: [args.parse()?, args.parse()?],
        },
        "layer-color" => {
            let base = args.child()?;
            let color = args.child()?;
            let mask = args.child()?;
            let s = args.next()?;
            let blend = parse_blend(s)
                .ok_or_else(|| Error::BadArgument(s.to_owned(), args.line))?;
            Op::ImageLayerColor {
                base,
                color,
                mask,
                blend,
            }
        }
        "instance-image" => Op::InstanceAdd {
            kind: InstanceAddKind::Image,
            instance: None,
            value: args.child()?,
            id: 0,
            external_id: 0,
            name: args.next()?.to_owned(),
        },
        "instance-lod" => {
            let lods = args
                .rest()
                .into_iter()
                .map(|s| args.node_by_name(s).map(Some))
                .collect::<Result<Vec<_>, _>>()?;
            Op::InstanceAddLod { lods }
        }
        op => return Err(Error::UnknownOpcode(op.to_owned())),
    };
    Ok(op)
}

fn parse_blend(s: &str) -> Option<BlendType> {
    (0..=u8::MAX)
        .map_while(BlendType::from_repr)
        .find(|b| <&'static str>::from(*b).eq_ignore_ascii_case(s))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::graph::DataType;

    #[test]
    fn test_from_text() {
        let txt = "
            _0 param-int lod 0 1 2
            _1 color 1 0 0 1
            _2 plain-color _1 16 16 Rgba8 1
            _3 pixel-format _2 L8
            _4 eq _0 1
            _5 if _4 _3 _2
            _6 instance-image _5 Diffuse
        ";
        let (g, root) = Graph::from_text(txt.as_bytes()).unwrap();
        assert_eq!(g.live_count(), 7);
        assert_eq!(g.data_type(root), DataType::Instance);
        let Op::InstanceAdd { value, name, .. } = g.op(root) else {
            panic!("bad root");
        };
        assert_eq!(name, "Diffuse");
        assert_eq!(g.data_type(value.unwrap()), DataType::Image);
    }

    #[test]
    fn test_switch() {
        let txt = "
            v param-int v 1 2 3
            a int 10
            b int 20
            d int 0
            s switch v d 1 a 2 b
        ";
        let (g, root) = Graph::from_text(txt.as_bytes()).unwrap();
        let Op::Switch { ty, cases, .. } = g.op(root) else {
            panic!("bad root");
        };
        assert_eq!(*ty, DataType::Int);
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[1].condition, 2);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            Graph::from_text("# nothing\n".as_bytes()),
            Err(Error::EmptyFile)
        ));
        assert!(matches!(
            Graph::from_text("_0 frobnicate".as_bytes()),
            Err(Error::UnknownOpcode(s)) if s == "frobnicate"
        ));
        assert!(matches!(
            Graph::from_text("_0 not _7".as_bytes()),
            Err(Error::UnknownNode(s)) if s == "_7"
        ));
        assert!(matches!(
            Graph::from_text("_0 int banana".as_bytes()),
            Err(Error::BadArgument(s, 1)) if s == "banana"
        ));
        assert!(matches!(
            Graph::from_text("_0 int 1\n_1 not _0".as_bytes()),
            Err(Error::WrongType { .. })
        ));
        assert!(matches!(
            Graph::from_text("_0 int".as_bytes()),
            Err(Error::MissingArgument(1))
        ));
    }

    #[test]
    fn test_layer_blend() {
        assert_eq!(parse_blend("multiply"), Some(BlendType::Multiply));
        assert_eq!(parse_blend("nope"), None);
    }
}
