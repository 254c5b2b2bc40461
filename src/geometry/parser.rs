use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{space0, space1, u32 as parse_u32},
    combinator::{all_consuming, map, map_res},
    number::complete::double,
    sequence::{preceded, terminated},
    IResult, Parser,
};

use crate::{
    calo_cell::{sampling::CaloSampling, CellGeometry},
    calo_errors::CaloError,
};

use super::LayerDirective;

/// One line of a geometry description.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum Directive {
    Layer(LayerDirective),
    Cell(CellGeometry),
}

fn real(input: &str) -> IResult<&str, f64> {
    preceded(space1, double).parse(input)
}

fn unsigned(input: &str) -> IResult<&str, u32> {
    preceded(space1, parse_u32).parse(input)
}

fn count(input: &str) -> IResult<&str, usize> {
    map(unsigned, |value| value as usize).parse(input)
}

fn sampling(input: &str) -> IResult<&str, CaloSampling> {
    map_res(unsigned, CaloSampling::try_from).parse(input)
}

fn word(input: &str) -> IResult<&str, &str> {
    preceded(space1, take_while1(|c: char| !c.is_whitespace())).parse(input)
}

fn parse_layer(input: &str) -> IResult<&str, LayerDirective> {
    map(
        (
            tag("L"),
            sampling,
            real,
            real,
            count,
            real,
            real,
            count,
            real,
            real,
        ),
        |(_, sampling, eta_min, eta_max, eta_bins, phi_min, phi_max, phi_bins, rmin, rmax)| {
            LayerDirective {
                sampling,
                eta_min,
                eta_max,
                eta_bins,
                phi_min,
                phi_max,
                phi_bins,
                rmin,
                rmax,
            }
        },
    )
    .parse(input)
}

fn parse_cell(input: &str) -> IResult<&str, CellGeometry> {
    map(
        (
            tag("C"),
            sampling,
            real,
            real,
            real,
            real,
            real,
            real,
            word,
            unsigned,
            unsigned,
        ),
        |(_, sampling, eta, phi, deta, dphi, rmin, rmax, hash, eta_channel, phi_channel)| {
            CellGeometry {
                sampling,
                eta,
                phi,
                deta,
                dphi,
                rmin,
                rmax,
                hash: hash.to_string(),
                eta_channel,
                phi_channel,
            }
        },
    )
    .parse(input)
}

/// Parse one non-empty, comment-free directive line.
pub(super) fn parse_directive_line(line: &str) -> Result<Directive, CaloError> {
    all_consuming(terminated(
        alt((
            map(parse_layer, Directive::Layer),
            map(parse_cell, Directive::Cell),
        )),
        space0,
    ))
    .parse(line)
    .map(|(_, directive)| directive)
    .map_err(|_| CaloError::GeometryParsing(line.to_string()))
}
