//! Output of a master equation solve and its on-disk cache.

use std::{ fs::File, path::Path };
use log::debug;
use ndarray as nd;
use ndarray_npy::{ NpzReader, NpzWriter, ReadableElement };
use num_complex::Complex64 as C64;
use crate::error::{ ObError, Result };

/// Compute the expectation value `Tr(op ρ)` of an operator.
pub fn expect_value<SA, SB>(
    op: &nd::ArrayBase<SA, nd::Ix2>,
    rho: &nd::ArrayBase<SB, nd::Ix2>,
) -> C64
where
    SA: nd::Data<Elem = C64>,
    SB: nd::Data<Elem = C64>,
{
    op.dot(rho).diag().sum()
}

/// The density matrix of an atom at every point of a time grid, along with the
/// expectation values of any requested observables.
#[derive(Clone, Debug, PartialEq)]
pub struct ObResult {
    tlist: nd::Array1<f64>,
    states: nd::Array3<C64>,
    expect: nd::Array2<C64>,
}

impl ObResult {
    /// Create a new result from solved states, computing expectation values of
    /// `e_ops`.
    ///
    /// `states` must have time along its last axis, with length equal to that
    /// of `tlist`. Each observable must be square with the dimension of the
    /// states.
    pub fn new(
        tlist: nd::Array1<f64>,
        states: nd::Array3<C64>,
        e_ops: &[nd::Array2<C64>],
    ) -> Self
    {
        let expect: nd::Array2<C64>
            = nd::Array2::from_shape_fn(
                (e_ops.len(), tlist.len()),
                |(i, k)| {
                    expect_value(
                        &e_ops[i], &states.index_axis(nd::Axis(2), k))
                },
            );
        Self { tlist, states, expect }
    }

    /// Get a reference to the time grid.
    pub fn tlist(&self) -> &nd::Array1<f64> { &self.tlist }

    /// Get a reference to the density matrices, with time along the last axis.
    pub fn states(&self) -> &nd::Array3<C64> { &self.states }

    /// Get a reference to the expectation values, one row per observable.
    pub fn expect(&self) -> &nd::Array2<C64> { &self.expect }

    /// Get the density matrix at the `k`-th time.
    pub fn state_at(&self, k: usize) -> Option<nd::ArrayView2<C64>> {
        (k < self.tlist.len())
            .then(|| self.states.index_axis(nd::Axis(2), k))
    }

    /// Write to an `.npz` archive at `path`.
    ///
    /// Complex arrays are stored as separate real and imaginary parts.
    pub fn save<P>(&self, path: P) -> Result<()>
    where P: AsRef<Path>
    {
        let path = path.as_ref();
        let mut npz = NpzWriter::new(File::create(path)?);
        npz.add_array("tlist", &self.tlist)?;
        npz.add_array("states_re", &self.states.mapv(|z| z.re))?;
        npz.add_array("states_im", &self.states.mapv(|z| z.im))?;
        npz.add_array("expect_re", &self.expect.mapv(|z| z.re))?;
        npz.add_array("expect_im", &self.expect.mapv(|z| z.im))?;
        npz.finish()?;
        debug!("wrote result to {}", path.display());
        Ok(())
    }

    /// Read from an `.npz` archive written by [`Self::save`].
    pub fn load<P>(path: P) -> Result<Self>
    where P: AsRef<Path>
    {
        let path = path.as_ref();
        let mut npz = NpzReader::new(File::open(path)?)?;
        let tlist: nd::Array1<f64> = read_array(&mut npz, "tlist")?;
        let states_re: nd::Array3<f64> = read_array(&mut npz, "states_re")?;
        let states_im: nd::Array3<f64> = read_array(&mut npz, "states_im")?;
        let expect_re: nd::Array2<f64> = read_array(&mut npz, "expect_re")?;
        let expect_im: nd::Array2<f64> = read_array(&mut npz, "expect_im")?;

        let nt = tlist.len();
        let sh = states_re.shape();
        if sh != states_im.shape() || sh[0] != sh[1] || sh[2] != nt {
            return Err(ObError::Cache(format!(
                "states of shape {:?} do not match a time grid of length {}",
                sh, nt,
            )));
        }
        if expect_re.shape() != expect_im.shape() || expect_re.ncols() != nt {
            return Err(ObError::Cache(format!(
                "expectation values of shape {:?} do not match a time grid \
                of length {}",
                expect_re.shape(), nt,
            )));
        }
        debug!("read result from {}", path.display());
        Ok(Self {
            tlist,
            states: complexify(&states_re, &states_im),
            expect: complexify(&expect_re, &expect_im),
        })
    }
}

fn complexify<D>(re: &nd::Array<f64, D>, im: &nd::Array<f64, D>)
    -> nd::Array<C64, D>
where D: nd::Dimension
{
    nd::Zip::from(re).and(im).map_collect(|r, i| C64::new(*r, *i))
}

// entries may or may not carry the `.npy` suffix depending on the writer
fn read_array<R, A, D>(npz: &mut NpzReader<R>, name: &str)
    -> Result<nd::Array<A, D>>
where
    R: std::io::Read + std::io::Seek,
    A: ReadableElement,
    D: nd::Dimension,
{
    let suffixed = format!("{}.npy", name);
    let entry: String
        = npz.names()?
        .into_iter()
        .find(|entry| entry == name || *entry == suffixed)
        .ok_or_else(|| ObError::Cache(format!("missing array '{}'", name)))?;
    Ok(npz.by_name(&entry)?)
}
