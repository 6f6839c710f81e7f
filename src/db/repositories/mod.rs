mod feedback;
mod samples;
mod sessions;
